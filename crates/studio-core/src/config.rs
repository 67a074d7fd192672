//! Editor tuning knobs shared by every Layer Studio view.

use crate::model::ModelError;
use crate::snap::{DEFAULT_GRID_SIZE, GridSnapper};
use serde::Deserialize;

/// Editor configuration. Every field has a default so partial JSON/TOML
/// documents deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Snap grid in canvas pixels.
    pub grid_size: u32,
    pub snap_enabled: bool,
    /// Maximum undo history length.
    pub max_history: usize,
    pub initial_zoom: f32,
    /// Side length used when a dropped asset has no intrinsic size.
    pub default_asset_size: u32,
    /// Dropped assets with intrinsic dimensions are scaled down to fit this box.
    pub max_drop_size: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            snap_enabled: true,
            max_history: 50,
            initial_zoom: 0.5,
            default_asset_size: 400,
            max_drop_size: 500,
        }
    }
}

impl EditorConfig {
    pub fn snapper(&self) -> Result<GridSnapper, ModelError> {
        GridSnapper::new(self.grid_size, self.snap_enabled)
    }
}
