use crate::TrayIconState;

/// Commands sent from the async runtime to the main UI thread.
///
/// The main thread owns `TrayManager` (because `TrayIcon` is `!Send`),
/// so all tray mutations and process lifecycle events flow through this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum TrayCommand {
    /// Update the tray icon to a new state.
    SetState(TrayIconState),
    /// Replace the tooltip text.
    SetTooltip(String),
    /// Redraw the recording icon for a new amplitude sample.
    SetLevel(f32),
    /// Shut down the application. The main thread will exit the event loop.
    Shutdown,
}

/// Destination for tray commands.
///
/// The running app talks to the `tao` event loop through its proxy, which
/// also wakes the main thread.
pub trait TraySink: Send {
    /// Deliver a command. Returns `false` once the receiver is gone.
    fn send(&self, command: TrayCommand) -> bool;
}

impl TraySink for tao::event_loop::EventLoopProxy<TrayCommand> {
    fn send(&self, command: TrayCommand) -> bool {
        self.send_event(command).is_ok()
    }
}
