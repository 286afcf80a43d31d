use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const HISTORY_FILE_NAME: &str = "history.json";

/// Local history log configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Location of the history log (None = `<data_dir>/history.json`).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl HistoryConfig {
    /// Configured path, or the default file under `data_dir`.
    pub fn resolve(&self, data_dir: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| data_dir.join(HISTORY_FILE_NAME))
    }
}
