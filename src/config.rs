//! Renderer configuration, stored as JSON

use crate::error::ConfigError;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_SCREEN_WIDTH: i32 = 640;
pub const DEFAULT_SCREEN_HEIGHT: i32 = 400;
pub const DEFAULT_TACTICAL_WIDTH: i32 = 480;
pub const DEFAULT_TACTICAL_HEIGHT: i32 = 384;
pub const DEFAULT_MERGE_DISTANCE: i32 = 32;
pub const DEFAULT_MAX_DIRTY_RECTS: usize = 128;
pub const DEFAULT_SHADOW_INTENSITY: f32 = 0.5;

/// Placement of the tactical (map) area on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ViewportConfig {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 16,
            width: DEFAULT_TACTICAL_WIDTH,
            height: DEFAULT_TACTICAL_HEIGHT,
        }
    }
}

/// Everything the compositor needs to know at construction time.
/// Missing fields fall back to their defaults when loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub screen_width: i32,
    pub screen_height: i32,
    pub viewport: ViewportConfig,
    /// Incremental redraw through dirty rectangles; full redraw otherwise
    pub dirty_rects: bool,
    pub merge_distance: i32,
    pub max_dirty_rects: usize,
    pub shadow_intensity: f32,
    pub water_animation: bool,
    pub fire_animation: bool,
    pub debug_overlay: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            viewport: ViewportConfig::default(),
            dirty_rects: true,
            merge_distance: DEFAULT_MERGE_DISTANCE,
            max_dirty_rects: DEFAULT_MAX_DIRTY_RECTS,
            shadow_intensity: DEFAULT_SHADOW_INTENSITY,
            water_animation: true,
            fire_animation: true,
            debug_overlay: false,
        }
    }
}

impl RenderConfig {
    pub fn screen_rect(&self) -> Rect {
        Rect::sized(self.screen_width, self.screen_height)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
