//! Core data model for Layer Studio compositions.
//!
//! A composition is scoped to an episode (optionally a scene) and always has
//! five fixed layers. Media assets from the episode library are placed onto
//! layers as `PositionedAsset`s with pixel geometry and a timing window.
//! Field names match the JSON bodies of the `/api/v1/layers` endpoints.

use crate::id::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("layer number {0} is outside 1..=5")]
    InvalidLayerNumber(i64),
    #[error("grid size must be positive")]
    InvalidGridSize,
}

// ─── Layers ──────────────────────────────────────────────────────────────

/// One of the five compositing tracks, in fixed paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub enum LayerKind {
    Background = 1,
    Footage = 2,
    Assets = 3,
    Text = 4,
    Audio = 5,
}

impl LayerKind {
    /// All kinds, bottom to top.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Background,
        LayerKind::Footage,
        LayerKind::Assets,
        LayerKind::Text,
        LayerKind::Audio,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: i64) -> Result<Self, ModelError> {
        match n {
            1 => Ok(LayerKind::Background),
            2 => Ok(LayerKind::Footage),
            3 => Ok(LayerKind::Assets),
            4 => Ok(LayerKind::Text),
            5 => Ok(LayerKind::Audio),
            other => Err(ModelError::InvalidLayerNumber(other)),
        }
    }

    /// Human-facing track name.
    pub fn display_name(self) -> &'static str {
        match self {
            LayerKind::Background => "Background",
            LayerKind::Footage => "Raw Footage",
            LayerKind::Assets => "Assets/Wardrobe",
            LayerKind::Text => "Text/Captions",
            LayerKind::Audio => "Audio/Music",
        }
    }

    /// `layer_type` value sent on bulk creation.
    pub fn slug(self) -> &'static str {
        match self {
            LayerKind::Background => "background",
            LayerKind::Footage => "footage",
            LayerKind::Assets => "assets",
            LayerKind::Text => "text",
            LayerKind::Audio => "audio",
        }
    }
}

impl TryFrom<i64> for LayerKind {
    type Error = ModelError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::from_number(n)
    }
}

impl From<LayerKind> for u8 {
    fn from(kind: LayerKind) -> u8 {
        kind.number()
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.number())
    }
}

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: RecordId,
    pub layer_number: LayerKind,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default = "default_one")]
    pub opacity: f32,
    #[serde(default)]
    pub is_locked: bool,
}

impl Layer {
    /// A visible, opaque, unlocked layer.
    pub fn new(id: RecordId, layer_number: LayerKind) -> Self {
        Self {
            id,
            layer_number,
            is_visible: true,
            opacity: 1.0,
            is_locked: false,
        }
    }
}

/// Partial update of a layer's properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_number: Option<LayerKind>,
}

impl LayerPatch {
    pub fn is_empty(&self) -> bool {
        self.is_visible.is_none()
            && self.opacity.is_none()
            && self.is_locked.is_none()
            && self.layer_number.is_none()
    }

    /// Apply every present field; opacity is clamped to `[0, 1]` and a
    /// non-finite opacity is ignored.
    pub fn apply(&self, layer: &mut Layer) {
        if let Some(v) = self.is_visible {
            layer.is_visible = v;
        }
        if let Some(o) = self.opacity.filter(|o| o.is_finite()) {
            layer.opacity = clamp_unit(o);
        }
        if let Some(l) = self.is_locked {
            layer.is_locked = l;
        }
        if let Some(n) = self.layer_number {
            layer.layer_number = n;
        }
    }

    /// The patch that turns `from` into `to`.
    pub fn diff(from: &Layer, to: &Layer) -> Self {
        Self {
            is_visible: (from.is_visible != to.is_visible).then_some(to.is_visible),
            opacity: (from.opacity != to.opacity).then_some(to.opacity),
            is_locked: (from.is_locked != to.is_locked).then_some(to.is_locked),
            layer_number: (from.layer_number != to.layer_number).then_some(to.layer_number),
        }
    }
}

// ─── Placed assets ───────────────────────────────────────────────────────

/// A media asset placed on a layer with canvas geometry and timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedAsset {
    pub id: RecordId,
    /// The underlying media library entry.
    pub asset_id: RecordId,
    /// Denormalized from the owning layer.
    pub layer_number: LayerKind,
    #[serde(default)]
    pub position_x: i32,
    #[serde(default)]
    pub position_y: i32,
    /// `None` = auto (intrinsic size).
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Degrees in `[0, 360)`.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_one")]
    pub scale_x: f32,
    #[serde(default = "default_one")]
    pub scale_y: f32,
    #[serde(default = "default_one")]
    pub opacity: f32,
    #[serde(default)]
    pub in_point_seconds: f64,
    /// `None` = visible until the end of the scene.
    #[serde(default)]
    pub out_point_seconds: Option<f64>,
}

impl PositionedAsset {
    pub fn new(id: RecordId, asset_id: RecordId, layer_number: LayerKind) -> Self {
        Self {
            id,
            asset_id,
            layer_number,
            position_x: 0,
            position_y: 0,
            width: None,
            height: None,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
            in_point_seconds: 0.0,
            out_point_seconds: None,
        }
    }

    /// Whether the asset's timing window covers `seconds`.
    pub fn visible_at(&self, seconds: f64) -> bool {
        seconds >= self.in_point_seconds && self.out_point_seconds.is_none_or(|out| seconds < out)
    }
}

/// Partial update of a placed asset. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<i32>,
    /// `Some(None)` resets to auto size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_point_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_point_seconds: Option<Option<f64>>,
}

impl AssetPatch {
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            position_x: Some(x),
            position_y: Some(y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn touches_position(&self) -> bool {
        self.position_x.is_some() || self.position_y.is_some()
    }

    /// Apply every present field, normalizing rotation and clamping
    /// opacity/scale so values never go negative. Non-finite numbers leave
    /// the current value in place.
    pub fn apply(&self, asset: &mut PositionedAsset) {
        if let Some(x) = self.position_x {
            asset.position_x = x;
        }
        if let Some(y) = self.position_y {
            asset.position_y = y;
        }
        if let Some(w) = self.width {
            asset.width = w;
        }
        if let Some(h) = self.height {
            asset.height = h;
        }
        if let Some(r) = self.rotation.filter(|r| r.is_finite()) {
            asset.rotation = normalize_degrees(r);
        }
        if let Some(sx) = self.scale_x.filter(|s| s.is_finite()) {
            asset.scale_x = sx.max(0.0);
        }
        if let Some(sy) = self.scale_y.filter(|s| s.is_finite()) {
            asset.scale_y = sy.max(0.0);
        }
        if let Some(o) = self.opacity.filter(|o| o.is_finite()) {
            asset.opacity = clamp_unit(o);
        }
        if let Some(t) = self.in_point_seconds.filter(|t| t.is_finite()) {
            asset.in_point_seconds = t.max(0.0);
        }
        if let Some(t) = self
            .out_point_seconds
            .filter(|t| t.is_none_or(|t| t.is_finite()))
        {
            asset.out_point_seconds = t.map(|t| t.max(0.0));
        }
    }

    /// The patch that turns `from` into `to` (layer number is not patchable).
    pub fn diff(from: &PositionedAsset, to: &PositionedAsset) -> Self {
        fn changed<T: PartialEq + Copy>(a: T, b: T) -> Option<T> {
            (a != b).then_some(b)
        }
        Self {
            position_x: changed(from.position_x, to.position_x),
            position_y: changed(from.position_y, to.position_y),
            width: changed(from.width, to.width),
            height: changed(from.height, to.height),
            rotation: changed(from.rotation, to.rotation),
            scale_x: changed(from.scale_x, to.scale_x),
            scale_y: changed(from.scale_y, to.scale_y),
            opacity: changed(from.opacity, to.opacity),
            in_point_seconds: changed(from.in_point_seconds, to.in_point_seconds),
            out_point_seconds: changed(from.out_point_seconds, to.out_point_seconds),
        }
    }
}

fn clamp_unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

fn normalize_degrees(deg: f32) -> f32 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

// ─── Media library ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    #[default]
    #[serde(other)]
    Other,
}

/// An entry in the episode's media library (what gets dropped on the canvas).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: MediaKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

// ─── Scenes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: RecordId,
    pub name: String,
    pub scene_number: u32,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /api/v1/scenes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewScene {
    pub episode_id: RecordId,
    pub name: String,
    pub scene_number: u32,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of `PATCH /api/v1/scenes/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which composition the editor is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionScope {
    pub episode_id: RecordId,
    pub scene_id: Option<RecordId>,
}

impl CompositionScope {
    pub fn episode(episode_id: RecordId) -> Self {
        Self {
            episode_id,
            scene_id: None,
        }
    }

    pub fn with_scene(self, scene_id: RecordId) -> Self {
        Self {
            scene_id: Some(scene_id),
            ..self
        }
    }
}
