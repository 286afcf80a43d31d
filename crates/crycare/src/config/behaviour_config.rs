use crate::config::default_notifications;

use serde::{Deserialize, Serialize};

/// Application behavior configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviourConfig {
    /// Whether notices, failures and classifications raise desktop notifications.
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

impl Default for BehaviourConfig {
    fn default() -> Self {
        Self {
            notifications: default_notifications(),
        }
    }
}
