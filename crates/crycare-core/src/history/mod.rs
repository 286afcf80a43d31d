mod record;
mod store;

pub use record::{HISTORY_ID_PREFIX, HistoryRecord, format_duration};
pub use store::{HISTORY_LIMIT, HistoryStore};
