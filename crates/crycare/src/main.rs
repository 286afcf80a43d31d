//! CryCare: record a crying baby from the system tray and classify the cry.

mod app;
mod app_command;
mod config;
mod error;
mod hotkey_handler;
mod notifier;
#[cfg(test)]
mod tests;
mod tray_command;
mod tray_icon_state;
mod tray_manager;

pub(crate) use {
    app::App,
    app_command::AppCommand,
    error::{AppError, Result as AppResult},
    hotkey_handler::HotkeyHandler,
    notifier::Notifier,
    tray_command::{TrayCommand, TraySink},
    tray_icon_state::TrayIconState,
    tray_manager::{TrayManager, TrayMenuIds},
};

use crate::config::Config;

use std::sync::Arc;

use crycare_core::{
    CaptureStateMachine, CpalBackend, HistoryStore, HttpPredictionClient, SubmissionPipeline,
};
use global_hotkey::GlobalHotKeyManager;
use tao::{
    event::Event,
    event_loop::{ControlFlow, EventLoopBuilder},
};
use tokio::sync::{mpsc, watch};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "crycare=debug,crycare_core=debug";

/// Build the capture machine and the history store it appends to.
fn build_machine(config: &Config) -> AppResult<(CaptureStateMachine, Arc<HistoryStore>)> {
    let data_dir = Config::data_dir()?;

    let client = Arc::new(HttpPredictionClient::new(
        &config.server.base_url,
        config.server.request_timeout(),
    )?);
    let store = Arc::new(HistoryStore::new(config.history_path()?).with_mirror(client.clone()));
    let backend = Arc::new(CpalBackend::new(data_dir.join("recordings")));

    let machine = CaptureStateMachine::new(
        backend,
        SubmissionPipeline::new(client, Arc::clone(&store)),
        config.recording.options(),
        config.recording.settings(),
    );
    Ok((machine, store))
}

/// Application entry point.
fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let event_loop = EventLoopBuilder::<TrayCommand>::with_user_event().build();
    let tray_proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    // Dropping the manager unregisters the hotkey.
    let mut hotkey_manager: Option<GlobalHotKeyManager> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(cmd) => {
                let result = match cmd {
                    TrayCommand::SetState(state) => tray_manager.update_state(state),
                    TrayCommand::SetTooltip(tooltip) => tray_manager.set_tooltip(&tooltip),
                    TrayCommand::SetLevel(level) => tray_manager.set_level(level),
                    TrayCommand::Shutdown => {
                        *control_flow = ControlFlow::ExitWithCode(0);
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    error!(error = ?e, "Failed to update tray icon");
                }
                return;
            }
            Event::NewEvents(tao::event::StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let paths = Config::config_path()
                    .and_then(|config_path| Ok((config_path, config.history_path()?)));
                let (config_path, history_path) = match paths {
                    Ok(paths) => paths,
                    Err(e) => {
                        error!("Failed to resolve config and history paths: {:?}", e);
                        std::process::exit(1);
                    }
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                let (command_tx, command_rx) = mpsc::channel(32);
                let (shutdown_tx, shutdown_rx) = watch::channel(false);

                // Register hotkey on the main thread; tao's event loop pumps
                // the Windows messages needed for WM_HOTKEY delivery.
                let (manager, hotkey_id) = match HotkeyHandler::register_hotkey() {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Failed to register hotkey: {:?}", e);
                        std::process::exit(1);
                    }
                };
                hotkey_manager = Some(manager);

                let tray_proxy = tray_proxy.clone();
                let menu_ids = tray_manager.menu_ids().clone();

                // Tokio runtime on a separate thread. TrayManager and
                // hotkey_manager stay on the main thread.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(async {
                        let (machine, store) = match build_machine(&config) {
                            Ok(built) => built,
                            Err(e) => {
                                error!("Failed to build capture machine: {:?}", e);
                                std::process::exit(1);
                            }
                        };

                        let hotkey_handler = HotkeyHandler::new(hotkey_id, command_tx.clone());
                        let (menu_rx, menu_handle) = app::spawn_menu_forwarder();

                        let app = App {
                            machine,
                            store,
                            notifier: Notifier::new(config.behaviour.notifications),
                            tray: Box::new(tray_proxy),
                            menu_ids,
                            history_path,
                            config_path,
                            command_tx,
                            command_rx,
                            menu_rx,
                            shutdown_tx,
                        };

                        tokio::join!(
                            async {
                                if let Err(e) = hotkey_handler.run(shutdown_rx).await {
                                    error!(error = ?e, "Hotkey handler error");
                                }
                            },
                            async {
                                if let Err(e) = app.run().await {
                                    error!(error = ?e, "App error");
                                }
                                app::join_forwarder("menu", menu_handle).await;
                            }
                        );
                    });
                });
            }
            _ => {}
        }

        // Keep hotkey_manager alive in the closure for the app's lifetime.
        let _ = &hotkey_manager;
    });
}
