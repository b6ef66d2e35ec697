//! Engine tuning knobs.
//!
//! Defaults reproduce the reference behavior; a host may load overrides
//! from JSON. Missing fields fall back to their defaults.

use crate::error::CanvasError;
use crate::geometry::Delta;
use crate::model::Color;
use serde::{Deserialize, Serialize};

/// Proximity thresholds for connector snapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Margin around a shape within which its connection points are offered.
    pub element_range: i32,
    /// Radius within which an endpoint locks onto a connection point.
    pub connection_point_range: i32,
    /// Per-event motion that tears an attached endpoint loose.
    pub detach_velocity: i32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            element_range: 20,
            connection_point_range: 10,
            detach_velocity: 5,
        }
    }
}

/// Drawing surface dimensions and backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
    /// Grid cell size. Zero disables the grid.
    pub grid_spacing: u32,
    pub grid_color: Color,
    pub background: Color,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            grid_spacing: 32,
            grid_color: Color::LIGHT_BLUE,
            background: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_width: i32,
    pub min_height: i32,
    pub snap: SnapConfig,
    /// Half-length of a connection-point marker.
    pub connection_point_size: i32,
    pub cap_size: i32,
    pub anchor_size: i32,
    pub anchor_proximity: i32,
    pub double_click_debounce_ms: u64,
    pub paste_offset: Delta,
    /// Padding between a group box and its children's extent.
    pub group_margin: i32,
    /// Maximum number of entries kept on the undo stack.
    pub undo_depth: usize,
    pub surface: SurfaceConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_width: 20,
            min_height: 20,
            snap: SnapConfig::default(),
            connection_point_size: 3,
            cap_size: 5,
            anchor_size: 6,
            anchor_proximity: 6,
            double_click_debounce_ms: 500,
            paste_offset: Delta::new(20, 20),
            group_margin: 5,
            undo_depth: 500,
            surface: SurfaceConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, CanvasError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
