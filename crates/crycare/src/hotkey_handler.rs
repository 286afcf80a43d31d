//! Global hotkey handler.
//!
//! Registers CTRL+SHIFT+R as a global hotkey and forwards each press to the
//! application as a toggle. Whether a press starts or stops a recording is
//! decided by the capture machine, not here.

use crate::{AppCommand, AppError, AppResult};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use global_hotkey::{
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
    hotkey::{Code, HotKey, Modifiers},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// Human-readable name of the registered shortcut.
pub const HOTKEY_NAME: &str = "CTRL+SHIFT+R";

/// Global hotkey listener.
pub struct HotkeyHandler {
    hotkey_id: u32,
    command_tx: mpsc::Sender<AppCommand>,
}

impl HotkeyHandler {
    /// Register CTRL+SHIFT+R as the global hotkey.
    ///
    /// Must be called on a thread with a message pump (e.g. the main thread
    /// running a `tao` event loop) so that `WM_HOTKEY` messages are
    /// dispatched on Windows. The returned [`GlobalHotKeyManager`] must be
    /// kept alive on that thread for the hotkey to remain registered.
    #[track_caller]
    #[instrument]
    pub fn register_hotkey() -> AppResult<(GlobalHotKeyManager, u32)> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to create manager: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let hotkey = HotKey::new(Some(Modifiers::CONTROL | Modifiers::SHIFT), Code::KeyR);

        manager
            .register(hotkey)
            .map_err(|e| AppError::HotkeyRegistrationFailed {
                reason: format!("Failed to register {}: {}", HOTKEY_NAME, e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(hotkey = HOTKEY_NAME, "Global hotkey registered");

        Ok((manager, hotkey.id()))
    }

    /// Create a handler for a previously registered hotkey.
    ///
    /// The `hotkey_id` should come from [`HotkeyHandler::register_hotkey`].
    /// This struct is `Send` and can live on any thread; it only listens on
    /// the global [`GlobalHotKeyEvent`] channel.
    pub fn new(hotkey_id: u32, command_tx: mpsc::Sender<AppCommand>) -> Self {
        Self {
            hotkey_id,
            command_tx,
        }
    }

    /// Run the hotkey handler event loop until a shutdown signal is received.
    #[instrument(skip(self))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> AppResult<()> {
        let receiver = GlobalHotKeyEvent::receiver().clone();
        let (event_tx, mut event_rx) = mpsc::channel(32);

        // GlobalHotKeyEvent::receiver() has a blocking recv(); one blocking
        // task forwards events until event_rx is dropped.
        let handle = tokio::task::spawn_blocking(move || {
            while let Ok(event) = receiver.recv() {
                if event_tx.blocking_send(event).is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Hotkey handler shutting down");
                    break;
                }
                Some(event) = event_rx.recv() => {
                    if event.state == HotKeyState::Pressed {
                        if let Err(e) = self.handle_hotkey_press(event.id).await {
                            warn!(error = ?e, "Failed to forward hotkey press");
                        }
                    }
                }
            }
        }

        drop(event_rx);

        // The blocking task may stay parked in recv() until the next hotkey
        // event; the runtime reclaims it on exit.
        match tokio::time::timeout(Duration::from_secs(1), handle).await {
            Ok(Ok(())) => debug!("Hotkey event forwarder stopped cleanly"),
            Ok(Err(e)) => warn!(error = ?e, "Hotkey event forwarder task panicked"),
            Err(_) => debug!(
                "Hotkey event forwarder did not stop within timeout, \
                   will be cleaned up on exit"
            ),
        }

        Ok(())
    }

    /// Forward a press of `hotkey_id` as a toggle. Presses of other hotkeys
    /// are ignored and return `false`.
    #[instrument(skip(self))]
    pub(crate) async fn handle_hotkey_press(&self, hotkey_id: u32) -> AppResult<bool> {
        if hotkey_id != self.hotkey_id {
            return Ok(false);
        }

        self.command_tx
            .send(AppCommand::Toggle)
            .await
            .map_err(|e| AppError::ChannelSendFailed {
                message: format!("Failed to send Toggle: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!("Hotkey press forwarded");
        Ok(true)
    }
}
