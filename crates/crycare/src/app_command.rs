/// Commands sent from the hotkey handler and tray menu to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start recording when idle, stop when recording.
    Toggle,
    /// Request application shutdown.
    Shutdown,
}
