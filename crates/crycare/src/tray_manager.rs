//! System tray icon with state-based updates.
//!
//! Manages a system tray icon with four states (Idle, Recording, Processing,
//! Error) and a context menu for recording, the history actions, Settings and
//! Exit. Icons are drawn at runtime; while recording the dot grows with the
//! input level.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use crycare_core::{AMPLITUDE_MAX, AMPLITUDE_MIN};
use error_location::ErrorLocation;
use image::{Rgba, RgbaImage};
use tracing::{info, instrument};
use tray_icon::menu::{Menu, MenuId, MenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// Edge length of the generated icon in pixels.
pub const ICON_SIZE: u32 = 32;

const IDLE_RADIUS: f32 = 10.0;
const MIN_LEVEL_RADIUS: f32 = 7.0;
const MAX_LEVEL_RADIUS: f32 = 15.0;

/// Menu item IDs the application reacts to.
#[derive(Debug, Clone)]
pub struct TrayMenuIds {
    /// Start/stop recording.
    pub record: MenuId,
    /// Open the local history log.
    pub history: MenuId,
    /// Summarize the server's history in a notification.
    pub remote_history: MenuId,
    /// Delete the most recent result, locally and on the server.
    pub delete_last: MenuId,
    /// Delete the whole local history.
    pub clear_history: MenuId,
    /// Open the configuration file.
    pub settings: MenuId,
    /// Quit.
    pub exit: MenuId,
}

/// System tray icon manager.
pub struct TrayManager {
    tray_icon: TrayIcon,
    record_item: MenuItem,
    menu_ids: TrayMenuIds,
    state: TrayIconState,
}

impl TrayManager {
    /// Create a new tray manager in the idle state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let record_item = MenuItem::new(record_label(TrayIconState::Idle), true, None);
        let history_item = MenuItem::new("History", true, None);
        let remote_history_item = MenuItem::new("Server history", true, None);
        let delete_last_item = MenuItem::new("Delete last result", true, None);
        let clear_history_item = MenuItem::new("Clear history", true, None);
        let settings_item = MenuItem::new("Settings", true, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let menu_ids = TrayMenuIds {
            record: record_item.id().clone(),
            history: history_item.id().clone(),
            remote_history: remote_history_item.id().clone(),
            delete_last: delete_last_item.id().clone(),
            clear_history: clear_history_item.id().clone(),
            settings: settings_item.id().clone(),
            exit: exit_item.id().clone(),
        };

        for item in [
            &record_item,
            &history_item,
            &remote_history_item,
            &delete_last_item,
            &clear_history_item,
            &settings_item,
            &exit_item,
        ] {
            menu.append(item).map_err(|e| AppError::TrayError {
                reason: format!("Failed to add menu item: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;
        }

        let icon = Self::icon(TrayIconState::Idle, AMPLITUDE_MIN)?;

        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(TrayIconState::Idle.tooltip(0))
            .with_menu(Box::new(menu))
            .with_icon(icon)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            record_item,
            menu_ids,
            state: TrayIconState::Idle,
        })
    }

    /// Update icon, tooltip and the record item for a new state.
    ///
    /// The record item is only enabled while a press would be honored.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn update_state(&mut self, state: TrayIconState) -> AppResult<()> {
        self.state = state;
        self.set_icon(Self::icon(state, AMPLITUDE_MIN)?)?;
        self.set_tooltip(&state.tooltip(0))?;

        self.record_item.set_text(record_label(state));
        self.record_item.set_enabled(matches!(
            state,
            TrayIconState::Idle | TrayIconState::Recording
        ));

        Ok(())
    }

    /// Replace the tooltip text.
    #[track_caller]
    pub fn set_tooltip(&mut self, tooltip: &str) -> AppResult<()> {
        self.tray_icon
            .set_tooltip(Some(tooltip))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update tooltip: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Redraw the recording icon for an amplitude sample. Ignored in other states.
    #[track_caller]
    pub fn set_level(&mut self, level: f32) -> AppResult<()> {
        if self.state != TrayIconState::Recording {
            return Ok(());
        }
        self.set_icon(Self::icon(TrayIconState::Recording, level)?)
    }

    /// Menu item IDs.
    pub fn menu_ids(&self) -> &TrayMenuIds {
        &self.menu_ids
    }

    #[track_caller]
    fn set_icon(&mut self, icon: Icon) -> AppResult<()> {
        self.tray_icon
            .set_icon(Some(icon))
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to update icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    #[track_caller]
    fn icon(state: TrayIconState, level: f32) -> AppResult<Icon> {
        let rgba = render_icon(state, level);
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Draw the tray icon: a filled dot in the state's color on a transparent
/// background. While recording, the radius follows `level`.
pub fn render_icon(state: TrayIconState, level: f32) -> RgbaImage {
    let color = state_color(state);
    let radius = match state {
        TrayIconState::Recording => level_radius(level),
        _ => IDLE_RADIUS,
    };
    let center = (ICON_SIZE as f32 - 1.0) / 2.0;

    RgbaImage::from_fn(ICON_SIZE, ICON_SIZE, |x, y| {
        let dx = x as f32 - center;
        let dy = y as f32 - center;
        if dx * dx + dy * dy <= radius * radius {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Dot radius for an amplitude sample, clamped to the indicator range.
pub fn level_radius(level: f32) -> f32 {
    let span = AMPLITUDE_MAX - AMPLITUDE_MIN;
    let t = ((level - AMPLITUDE_MIN) / span).clamp(0.0, 1.0);
    MIN_LEVEL_RADIUS + t * (MAX_LEVEL_RADIUS - MIN_LEVEL_RADIUS)
}

fn state_color(state: TrayIconState) -> Rgba<u8> {
    match state {
        TrayIconState::Idle => Rgba([0x9e, 0x9e, 0x9e, 0xff]),
        TrayIconState::Recording => Rgba([0xe5, 0x39, 0x35, 0xff]),
        TrayIconState::Processing => Rgba([0xff, 0xb3, 0x00, 0xff]),
        TrayIconState::Error => Rgba([0x8e, 0x24, 0xaa, 0xff]),
    }
}

fn record_label(state: TrayIconState) -> &'static str {
    match state {
        TrayIconState::Recording => "Stop Recording",
        _ => "Start Recording",
    }
}
