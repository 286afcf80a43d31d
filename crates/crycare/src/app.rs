use crate::{
    AppCommand, AppResult, Notifier, TrayCommand, TrayIconState, TrayMenuIds, TraySink,
    notifier::NotificationText,
};

use std::{path::PathBuf, sync::Arc, time::Duration};

use crycare_core::{CaptureState, CaptureStateMachine, HistoryStore};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};
use tray_icon::menu::MenuEvent;

/// Main application state.
///
/// Runs on the async runtime thread. Tray updates go back to the main thread
/// through `tray` because `TrayIcon` is `!Send` and must remain on the UI
/// thread.
pub struct App {
    pub(crate) machine: CaptureStateMachine,
    pub(crate) store: Arc<HistoryStore>,
    pub(crate) notifier: Notifier,
    pub(crate) tray: Box<dyn TraySink>,
    pub(crate) menu_ids: TrayMenuIds,
    pub(crate) history_path: PathBuf,
    pub(crate) config_path: PathBuf,
    pub(crate) command_tx: mpsc::Sender<AppCommand>,
    pub(crate) command_rx: mpsc::Receiver<AppCommand>,
    pub(crate) menu_rx: mpsc::Receiver<MenuEvent>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
}

/// Forward tray menu events into an async channel.
///
/// `MenuEvent::receiver()` has a blocking `recv()`, so one blocking task
/// forwards events until the returned receiver is dropped.
pub fn spawn_menu_forwarder() -> (mpsc::Receiver<MenuEvent>, JoinHandle<()>) {
    let (menu_tx, menu_rx) = mpsc::channel(32);
    let handle = tokio::task::spawn_blocking(move || {
        let receiver = MenuEvent::receiver();
        while let Ok(event) = receiver.recv() {
            if menu_tx.blocking_send(event).is_err() {
                break;
            }
        }
    });
    (menu_rx, handle)
}

/// Wait briefly for a forwarder task; it may stay parked in `recv()`.
pub async fn join_forwarder(name: &str, handle: JoinHandle<()>) {
    match tokio::time::timeout(Duration::from_secs(1), handle).await {
        Ok(Ok(())) => debug!(forwarder = name, "Event forwarder stopped cleanly"),
        Ok(Err(e)) => error!(forwarder = name, error = ?e, "Event forwarder task panicked"),
        Err(_) => debug!(
            forwarder = name,
            "Event forwarder did not stop within timeout, will be cleaned up on exit"
        ),
    }
}

impl App {
    /// Run the main application event loop until shutdown.
    ///
    /// On exit the capture machine is torn down before the main thread is
    /// told to leave its event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("CryCare starting");

        let mut state_rx = self.machine.subscribe_state();
        let mut elapsed_rx = self.machine.subscribe_elapsed();
        let mut amplitude_rx = self.machine.subscribe_amplitude();
        let mut events_rx = self.machine.subscribe_events();

        loop {
            tokio::select! {
                Some(event) = self.menu_rx.recv() => {
                    if let Err(e) = self.handle_tray_event(event).await {
                        error!(error = ?e, "Failed to handle tray event");
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        AppCommand::Toggle => self.toggle(),
                        AppCommand::Shutdown => {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                }

                Ok(()) = state_rx.changed() => {
                    let state = *state_rx.borrow_and_update();
                    self.publish_state(state);
                }

                Ok(()) = elapsed_rx.changed() => {
                    let seconds = *elapsed_rx.borrow_and_update();
                    if self.machine.state() == CaptureState::Recording {
                        self.send_tray(TrayCommand::SetTooltip(
                            TrayIconState::Recording.tooltip(seconds),
                        ));
                    }
                }

                Ok(()) = amplitude_rx.changed() => {
                    let level = *amplitude_rx.borrow_and_update();
                    self.send_tray(TrayCommand::SetLevel(level));
                }

                received = events_rx.recv() => {
                    match received {
                        Ok(event) => {
                            if let Err(e) = self.notifier.notify(&event).await {
                                warn!(error = ?e, "Failed to show notification");
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Capture events dropped");
                        }
                        Err(RecvError::Closed) => {
                            info!("Capture event channel closed, shutting down");
                            break;
                        }
                    }
                }

                else => {
                    info!("All channels closed, shutting down");
                    break;
                }
            }
        }

        self.machine.teardown().await;

        self.send_tray(TrayCommand::Shutdown);
        let _ = self.shutdown_tx.send(true);
        info!("CryCare shut down successfully");

        Ok(())
    }

    /// Press the toggle without blocking the loop; the machine holds the
    /// press until the recording is submitted.
    fn toggle(&self) {
        let machine = self.machine.clone();
        tokio::spawn(async move {
            if !machine.toggle().await {
                debug!(state = %machine.state(), "Toggle ignored");
            }
        });
    }

    fn publish_state(&self, state: CaptureState) {
        let tray_state = TrayIconState::from(state);
        debug!(state = %state, tray_state = ?tray_state, "Publishing capture state");
        self.send_tray(TrayCommand::SetState(tray_state));
    }

    fn send_tray(&self, command: TrayCommand) {
        if !self.tray.send(command) {
            debug!("Tray event loop gone, dropping command");
        }
    }

    /// Handle tray menu events.
    #[instrument(skip(self))]
    async fn handle_tray_event(&self, event: MenuEvent) -> AppResult<()> {
        let event_id = &event.id;

        if *event_id == self.menu_ids.record {
            self.toggle();
        } else if *event_id == self.menu_ids.history {
            if self.history_path.exists() {
                open::that(&self.history_path)?;
                info!(history_path = ?self.history_path, "Opened history log");
            } else {
                info!(history_path = ?self.history_path, "No history recorded yet");
            }
        } else if *event_id == self.menu_ids.remote_history {
            let entries = self.store.remote_entries().await?;
            info!(count = entries.len(), "Fetched server history");
            self.notifier
                .show(NotificationText::remote_history(&entries))
                .await?;
        } else if *event_id == self.menu_ids.delete_last {
            self.delete_last_result().await?;
        } else if *event_id == self.menu_ids.clear_history {
            self.store.clear().await?;
            info!("History cleared from tray menu");
            self.notifier
                .show(NotificationText::notice("History cleared"))
                .await?;
        } else if *event_id == self.menu_ids.settings {
            open::that(&self.config_path)?;
            info!(config_path = ?self.config_path, "Opened settings");
        } else if *event_id == self.menu_ids.exit {
            info!("Exit requested from tray menu");
            if let Err(e) = self.command_tx.send(AppCommand::Shutdown).await {
                error!(error = ?e, "Failed to send shutdown command");
            }
        }

        Ok(())
    }

    /// Delete the newest history record through the store so the server's
    /// copy goes with it.
    async fn delete_last_result(&self) -> AppResult<()> {
        let records = self.store.list().await?;
        let Some(latest) = records.first() else {
            info!("No history to delete");
            return Ok(());
        };

        self.store.delete(&latest.id).await?;
        info!(id = %latest.id, label = %latest.prediction_label, "Deleted last result");
        self.notifier
            .show(NotificationText::notice(format!(
                "Deleted {} result",
                latest.prediction_label
            )))
            .await
    }
}
