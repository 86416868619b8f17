//! Injected layout and threshold configuration for the panel subsystem.
//!
//! Every pixel constant, animation duration, and poll interval lives
//! here so the containers have no process-wide tunables. The settings
//! serialize to JSON for persistence across sessions.

use serde::{Deserialize, Serialize};
use shell::geometry::Size;
use std::path::Path;
use tracing::info;

/// Errors from loading or saving settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level settings for the whole subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PanelSettings {
    #[serde(default)]
    pub bar: BarSettings,
    #[serde(default)]
    pub dock: DockSettings,
    #[serde(default)]
    pub resize: ResizeSettings,
    #[serde(default)]
    pub drag: DragSettings,
    /// Settings version for future migration support
    #[serde(default)]
    pub version: u32,
}

/// Layout of the bottom-edge panel bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSettings {
    /// Pixels between the rightmost panel and the right screen edge.
    pub right_padding: i32,
    /// Pixels between adjacent panels.
    pub panel_gap: i32,
    /// Height of the bottom input strip that reveals collapsed panels.
    pub show_collapsed_strip_height: i32,
    /// How far the pointer may move up from the bottom of the screen
    /// before shown collapsed panels are hidden again.
    pub hide_collapsed_distance: i32,
    /// How much of a hidden collapsed panel's titlebar peeks up from the
    /// bottom of the screen.
    pub hidden_collapsed_peek: i32,
    /// How far left of the packed group a panel must be dragged before
    /// it becomes floating.
    pub floating_threshold: i32,
    /// How close a dragged panel's bottom edge must come to the screen
    /// bottom before the bar claims it.
    pub attach_threshold: i32,
    /// How far above the bar a panel must be dragged before it detaches.
    pub detach_threshold: i32,
    /// Whether panels may be dragged out of the bar at all.
    pub allow_detach: bool,
    /// Click target shown after a collapsed panel is expanded.
    pub anchor_size: Size,
    pub arrange_anim_ms: u32,
    pub state_anim_ms: u32,
    pub dropped_anim_ms: u32,
    pub hide_anim_ms: u32,
    pub anchor_fade_ms: u32,
    /// Delay before collapsed panels are revealed once the pointer
    /// reaches the bottom strip.
    pub show_delay_ms: u64,
}

impl Default for BarSettings {
    fn default() -> Self {
        Self {
            right_padding: 24,
            panel_gap: 6,
            show_collapsed_strip_height: 1,
            hide_collapsed_distance: 30,
            hidden_collapsed_peek: 3,
            floating_threshold: 30,
            attach_threshold: 20,
            detach_threshold: 50,
            allow_detach: true,
            anchor_size: Size::new(32, 32),
            arrange_anim_ms: 150,
            state_anim_ms: 150,
            dropped_anim_ms: 50,
            hide_anim_ms: 100,
            anchor_fade_ms: 150,
            show_delay_ms: 200,
        }
    }
}

/// Layout of the left/right panel docks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockSettings {
    /// Fixed dock width; panels are resized to match on attach.
    pub width: i32,
    /// How close a dragged panel must come to the screen edge before
    /// the dock claims it.
    pub attach_threshold: i32,
    /// How far inward a docked panel must be dragged before it
    /// detaches. Larger than `attach_threshold` so a panel hovering at
    /// the boundary doesn't flutter in and out.
    pub detach_threshold: i32,
    pub pack_anim_ms: u32,
    pub shadow_anim_ms: u32,
    pub background_anim_ms: u32,
}

impl Default for DockSettings {
    fn default() -> Self {
        Self {
            width: 256,
            attach_threshold: 20,
            detach_threshold: 50,
            pack_anim_ms: 150,
            shadow_anim_ms: 150,
            background_anim_ms: 0,
        }
    }
}

/// Interactive-resize behavior for individual panels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeSettings {
    /// Width of the invisible resize border around a panel.
    pub border_width: i32,
    /// Size of the corner pieces of the resize border.
    pub corner_size: i32,
    /// How often pending resize motion is applied.
    pub update_interval_ms: u64,
    /// Resize the panel live instead of dragging a translucent preview.
    pub opaque: bool,
    /// Opacity of the preview box shown during non-opaque resizes.
    pub box_opacity: f64,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            border_width: 3,
            corner_size: 20,
            update_interval_ms: 25,
            opaque: false,
            box_opacity: 0.4,
        }
    }
}

/// Coalescing for inbound drag positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragSettings {
    pub update_interval_ms: u64,
    /// Animation used when a panel detaches and snaps to the pointer.
    pub detach_anim_ms: u32,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: 50,
            detach_anim_ms: 100,
        }
    }
}

impl PanelSettings {
    /// Save settings to a specific path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!("Saved panel settings to {:?}", path.as_ref());
        Ok(())
    }

    /// Load settings from a specific path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&content)?;
        info!("Loaded panel settings from {:?}", path.as_ref());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = PanelSettings::default();
        assert_eq!(settings.bar.right_padding, 24);
        assert_eq!(settings.bar.panel_gap, 6);
        assert_eq!(settings.dock.width, 256);
        assert!(settings.dock.detach_threshold > settings.dock.attach_threshold);
        assert!(!settings.resize.opaque);
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut settings = PanelSettings::default();
        settings.bar.right_padding = 32;
        settings.dock.width = 300;
        settings.resize.opaque = true;

        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        settings
            .save_to(temp_file.path())
            .expect("Failed to save settings");

        let loaded = PanelSettings::load_from(temp_file.path()).expect("Failed to load settings");
        assert_eq!(loaded.bar.right_padding, 32);
        assert_eq!(loaded.dock.width, 300);
        assert!(loaded.resize.opaque);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp_file.path(), "{ invalid json }").expect("Failed to write file");
        assert!(PanelSettings::load_from(temp_file.path()).is_err());
    }
}
