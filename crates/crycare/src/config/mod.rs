mod behaviour_config;
#[allow(clippy::module_inception)]
mod config;
mod history_config;
mod recording_config;
mod server_config;

pub(crate) use {
    behaviour_config::BehaviourConfig, config::Config, history_config::HistoryConfig,
    recording_config::RecordingConfig, server_config::ServerConfig,
};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_NOTIFICATIONS: bool = true;
pub(crate) const DEFAULT_MIN_DURATION_MS: u64 = 1_000;
pub(crate) const DEFAULT_ERROR_RECOVERY_DELAY_MS: u64 = 1_000;
pub(crate) const DEFAULT_SETTLE_DELAY_MS: u64 = 300;

pub(crate) fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub(crate) fn default_notifications() -> bool {
    DEFAULT_NOTIFICATIONS
}

pub(crate) fn default_min_duration_ms() -> u64 {
    DEFAULT_MIN_DURATION_MS
}

pub(crate) fn default_error_recovery_delay_ms() -> u64 {
    DEFAULT_ERROR_RECOVERY_DELAY_MS
}

pub(crate) fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}
