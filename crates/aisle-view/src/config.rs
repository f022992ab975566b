//! View settings loaded from TOML
//!
//! ```toml
//! [interaction]
//! drag_threshold_px = 5.0
//! drag_modifier = "shift"
//!
//! [tracks]
//! trail_window_secs = 10.0
//!
//! [render]
//! hidden_tick_interval_secs = 1.0
//! ```

use crate::input::DragModifier;
use aisle_core::{AisleError, Result};
use aisle_scene::TrackSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default)]
    pub interaction: InteractionSettings,
    #[serde(default)]
    pub tracks: TrackSettings,
    #[serde(default)]
    pub render: RenderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSettings {
    /// Pointer travel before a pending drag becomes a drag
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold_px: f32,
    #[serde(default)]
    pub drag_modifier: DragModifier,
    /// Right-click rotation increment
    #[serde(default = "default_rotation_step")]
    pub rotation_step_degrees: f32,
    /// Neighbor alignment distance in meters
    #[serde(default = "default_snap_threshold")]
    pub snap_threshold: f32,
    #[serde(default = "default_true")]
    pub collision_enabled: bool,
    #[serde(default = "default_true")]
    pub grid_snap_enabled: bool,
}

fn default_drag_threshold() -> f32 {
    5.0
}

fn default_rotation_step() -> f32 {
    45.0
}

fn default_snap_threshold() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            drag_threshold_px: default_drag_threshold(),
            drag_modifier: DragModifier::default(),
            rotation_step_degrees: default_rotation_step(),
            snap_threshold: default_snap_threshold(),
            collision_enabled: true,
            grid_snap_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Frame spacing while the view is hidden
    #[serde(default = "default_hidden_interval")]
    pub hidden_tick_interval_secs: f64,
    #[serde(default = "default_selection_emissive")]
    pub selection_emissive: f32,
    /// Mesh loads resolved per tick
    #[serde(default = "default_asset_budget")]
    pub asset_loads_per_tick: usize,
}

fn default_hidden_interval() -> f64 {
    1.0
}

fn default_selection_emissive() -> f32 {
    0.4
}

fn default_asset_budget() -> usize {
    4
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            hidden_tick_interval_secs: default_hidden_interval(),
            selection_emissive: default_selection_emissive(),
            asset_loads_per_tick: default_asset_budget(),
        }
    }
}

impl ViewSettings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values that would stall or invert interaction
    pub fn validate(&self) -> Result<()> {
        check_range("interaction.drag_threshold_px", self.interaction.drag_threshold_px as f64, 0.0, 100.0)?;
        check_range("interaction.rotation_step_degrees", self.interaction.rotation_step_degrees as f64, 1.0, 180.0)?;
        check_range("interaction.snap_threshold", self.interaction.snap_threshold as f64, 0.0, 10.0)?;
        check_range("tracks.trail_window_secs", self.tracks.trail_window_secs, 0.0, 3600.0)?;
        check_range("tracks.label_window_secs", self.tracks.label_window_secs, 0.0, 3600.0)?;
        check_range("tracks.highlight_opacity", self.tracks.highlight_opacity as f64, 0.0, 1.0)?;
        check_range("render.hidden_tick_interval_secs", self.render.hidden_tick_interval_secs, 0.0, 60.0)?;
        check_range("render.selection_emissive", self.render.selection_emissive as f64, 0.0, 10.0)?;
        if self.tracks.max_trail_points < 2 {
            return Err(AisleError::ConfigError(
                "tracks.max_trail_points must be at least 2".into(),
            ));
        }
        if self.render.asset_loads_per_tick == 0 {
            return Err(AisleError::ConfigError(
                "render.asset_loads_per_tick must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AisleError::ValueOutOfRange {
            field: field.to_string(),
            min,
            max,
            value,
        })
    }
}
