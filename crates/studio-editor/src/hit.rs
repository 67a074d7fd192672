//! Hit testing: canvas point → placed asset lookup.
//!
//! Walks layers from the top (highest number) down and, within a layer,
//! from the last-painted asset back, returning the first asset whose
//! bounds contain the point. Rotation is ignored.

use crate::store::LayerStore;
use studio_core::id::RecordId;
use studio_core::model::{LayerKind, PositionedAsset};

/// Axis-aligned canvas rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }
}

/// On-canvas bounds of an asset. Auto-sized assets use `auto_size`.
pub fn asset_bounds(asset: &PositionedAsset, auto_size: u32) -> Bounds {
    let w = asset.width.unwrap_or(auto_size) as f32 * asset.scale_x;
    let h = asset.height.unwrap_or(auto_size) as f32 * asset.scale_y;
    Bounds {
        x: asset.position_x as f32,
        y: asset.position_y as f32,
        width: w,
        height: h,
    }
}

/// Find the topmost asset at canvas position (px, py). Hidden layers are
/// transparent to hits. Returns the asset and its layer.
pub fn hit_test(store: &LayerStore, px: f32, py: f32, auto_size: u32) -> Option<(RecordId, LayerKind)> {
    LayerKind::ALL.iter().rev().find_map(|&kind| {
        let layer = store.layer(kind)?;
        if !layer.is_visible {
            return None;
        }
        store
            .assets_on(kind)
            .rev()
            .find(|a| asset_bounds(a, auto_size).contains(px, py))
            .map(|a| (a.id, kind))
    })
}
