//! In-memory mirror of a composition's layers and placed assets.
//!
//! Every mutation updates local state immediately and returns the backend
//! writes that persist it. Nothing is rolled back if those writes fail; the
//! next full load resynchronizes.
//!
//! Records created locally carry provisional ids until the server answers.
//! Writes against a provisional record are not sent; instead the
//! acknowledgement diffs the server's copy against local state and sends
//! whatever changed in the meantime.

use crate::persist::{Ops, RemoteOp};
use log::{debug, warn};
use studio_core::config::EditorConfig;
use studio_core::id::RecordId;
use studio_core::model::*;
use studio_core::snap::GridSnapper;

/// Position used when an asset is dropped without pointer coordinates.
pub const DEFAULT_DROP_POSITION: (i32, i32) = (100, 100);

/// Whole editable state, as stored in undo history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub layers: Vec<Layer>,
    pub assets: Vec<PositionedAsset>,
    pub media: Vec<MediaAsset>,
}

impl StoreSnapshot {
    /// Replace an id wherever it names a layer or placed asset.
    pub fn rename(&mut self, from: RecordId, to: RecordId) {
        for layer in self.layers.iter_mut().filter(|l| l.id == from) {
            layer.id = to;
        }
        for asset in self.assets.iter_mut().filter(|a| a.id == from) {
            asset.id = to;
        }
    }
}

/// A layer as fetched from the server, with its placed assets.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedLayer {
    pub layer: Layer,
    pub assets: Vec<PositionedAsset>,
}

/// Result of reconciling local state with a server acknowledgement or a
/// history restore.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciled {
    pub ops: Ops,
    /// `(old, new)` id replacements the caller must apply to anything else
    /// that holds ids (selection, history).
    pub renamed: Vec<(RecordId, RecordId)>,
}

#[derive(Debug, Default)]
pub struct LayerStore {
    scope: Option<CompositionScope>,
    layers: Vec<Layer>,
    assets: Vec<PositionedAsset>,
    media: Vec<MediaAsset>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn scope(&self) -> Option<CompositionScope> {
        self.scope
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn assets(&self) -> &[PositionedAsset] {
        &self.assets
    }

    pub fn media(&self) -> &[MediaAsset] {
        &self.media
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|l| l.layer_number == kind)
    }

    pub fn layer_by_id(&self, id: RecordId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn asset(&self, id: RecordId) -> Option<&PositionedAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Assets on one layer in paint order (last is topmost).
    pub fn assets_on(&self, kind: LayerKind) -> impl DoubleEndedIterator<Item = &PositionedAsset> {
        self.assets.iter().filter(move |a| a.layer_number == kind)
    }

    pub fn media_asset(&self, id: RecordId) -> Option<&MediaAsset> {
        self.media.iter().find(|m| m.id == id)
    }

    pub fn is_initialized(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            layers: self.layers.clone(),
            assets: self.assets.clone(),
            media: self.media.clone(),
        }
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Replace everything with freshly fetched server state. Layers are
    /// deduplicated by number (first occurrence wins); assets belonging to
    /// a discarded duplicate are dropped with it.
    pub fn load(&mut self, scope: CompositionScope, fetched: Vec<LoadedLayer>, media: Vec<MediaAsset>) {
        self.scope = Some(scope);
        self.layers.clear();
        self.assets.clear();

        for LoadedLayer { layer, assets } in fetched {
            if self.layer(layer.layer_number).is_some() {
                debug!("skipping duplicate layer {} ({})", layer.layer_number.number(), layer.id);
                continue;
            }
            self.assets.extend(assets.into_iter().map(|mut a| {
                a.layer_number = layer.layer_number;
                a
            }));
            self.layers.push(layer);
        }
        self.layers.sort_by_key(|l| l.layer_number);
        self.media = media;
    }

    /// Replace only the media library.
    pub fn set_media(&mut self, media: Vec<MediaAsset>) {
        self.media = media;
    }

    /// Create the five standard layers. No-op if any layer already exists.
    pub fn initialize(&mut self, scope: CompositionScope) -> Option<Ops> {
        if self.is_initialized() {
            warn!("layers already initialized; ignoring");
            return None;
        }
        self.scope = Some(scope);
        let provisional: Vec<(LayerKind, RecordId)> = LayerKind::ALL
            .iter()
            .map(|&kind| (kind, RecordId::provisional()))
            .collect();
        self.layers = provisional
            .iter()
            .map(|&(kind, id)| Layer::new(id, kind))
            .collect();

        let mut ops = Ops::new();
        ops.push(RemoteOp::CreateLayers { scope, provisional });
        Some(ops)
    }

    /// Adopt server ids for bulk-created layers and send any edits made
    /// while creation was in flight.
    pub fn acknowledge_layers(&mut self, created: &[Layer]) -> Reconciled {
        let mut out = Reconciled::default();
        for server in created {
            let Some(local) = self
                .layers
                .iter_mut()
                .find(|l| l.layer_number == server.layer_number && l.id.is_provisional())
            else {
                continue;
            };
            let old = local.id;
            local.id = server.id;
            out.renamed.push((old, server.id));

            let patch = LayerPatch::diff(server, local);
            if !patch.is_empty() {
                out.ops.push(RemoteOp::UpdateLayer {
                    id: server.id,
                    patch,
                });
            }
        }
        out
    }

    // ─── Assets ──────────────────────────────────────────────────────────

    /// Place a media asset on a layer at a snapped position. Returns the new
    /// asset's provisional id, or `None` if the layer is missing, locked, or
    /// not yet persisted.
    pub fn drop_asset(
        &mut self,
        media_id: RecordId,
        layer: LayerKind,
        position: Option<(i32, i32)>,
        snapper: &GridSnapper,
        config: &EditorConfig,
    ) -> Option<(RecordId, Ops)> {
        let Some(target) = self.layer(layer) else {
            warn!("drop onto missing layer {}", layer.number());
            return None;
        };
        if target.is_locked {
            warn!("drop onto locked layer {}", layer.number());
            return None;
        }
        if target.id.is_provisional() {
            warn!("drop onto layer {} before it was created", layer.number());
            return None;
        }
        let layer_id = target.id;

        let (raw_x, raw_y) = position.unwrap_or(DEFAULT_DROP_POSITION);
        let (x, y) = snapper.snap_position(raw_x, raw_y);
        let (width, height) = drop_size(self.media_asset(media_id), config);

        let mut asset = PositionedAsset::new(RecordId::provisional(), media_id, layer);
        asset.position_x = x;
        asset.position_y = y;
        asset.width = Some(width);
        asset.height = Some(height);
        let id = asset.id;
        self.assets.push(asset.clone());

        let mut ops = Ops::new();
        ops.push(RemoteOp::CreateAsset { layer_id, asset });
        Some((id, ops))
    }

    /// Patch an asset. Position fields are snapped; a missing axis is taken
    /// from the asset's current position. `None` if the asset is unknown or
    /// the patch changes nothing.
    pub fn update_asset(&mut self, id: RecordId, patch: &AssetPatch, snapper: &GridSnapper) -> Option<Ops> {
        let current = self.asset(id)?;
        let mut patch = patch.clone();
        if patch.touches_position() && snapper.is_enabled() {
            let (x, y) = snapper.snap_position(
                patch.position_x.unwrap_or(current.position_x),
                patch.position_y.unwrap_or(current.position_y),
            );
            patch.position_x = Some(x);
            patch.position_y = Some(y);
        }
        self.patch_asset(id, &patch)
    }

    /// Move by an exact pixel offset, bypassing the grid. Assets on locked
    /// layers stay put.
    pub fn nudge_asset(&mut self, id: RecordId, dx: i32, dy: i32) -> Option<Ops> {
        let current = self.asset(id)?;
        if self.layer(current.layer_number).is_some_and(|l| l.is_locked) {
            warn!("nudge of asset {id} on locked layer {}", current.layer_number.number());
            return None;
        }
        let patch = AssetPatch::position(
            current.position_x.saturating_add(dx),
            current.position_y.saturating_add(dy),
        );
        self.patch_asset(id, &patch)
    }

    /// Reposition during a drag. Local only; the drag commits through
    /// [`LayerStore::update_asset`] on release.
    pub fn move_asset_live(&mut self, id: RecordId, x: i32, y: i32) -> bool {
        match self.assets.iter_mut().find(|a| a.id == id) {
            Some(asset) => {
                asset.position_x = x;
                asset.position_y = y;
                true
            }
            None => false,
        }
    }

    pub fn remove_asset(&mut self, id: RecordId) -> Option<Ops> {
        let idx = self.assets.iter().position(|a| a.id == id)?;
        self.assets.remove(idx);
        let mut ops = Ops::new();
        if !id.is_provisional() {
            ops.push(RemoteOp::DeleteAsset { id });
        }
        Some(ops)
    }

    /// Adopt the server id for a created asset. If the asset was removed
    /// while creation was in flight, the server copy is deleted.
    pub fn acknowledge_asset(&mut self, provisional: RecordId, server: &PositionedAsset) -> Reconciled {
        let mut out = Reconciled::default();
        let Some(local) = self.assets.iter_mut().find(|a| a.id == provisional) else {
            debug!("asset {provisional} gone before creation finished; deleting {}", server.id);
            out.ops.push(RemoteOp::DeleteAsset { id: server.id });
            return out;
        };
        local.id = server.id;
        out.renamed.push((provisional, server.id));

        let patch = AssetPatch::diff(server, local);
        if !patch.is_empty() {
            out.ops.push(RemoteOp::UpdateAsset {
                id: server.id,
                patch,
            });
        }
        out
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Patch a layer. Changing `layer_number` swaps numbers with the layer
    /// that currently holds the target number, carrying assets along.
    /// `None` if the layer is unknown or the patch changes nothing.
    pub fn update_layer(&mut self, id: RecordId, patch: &LayerPatch) -> Option<Ops> {
        let idx = self.layers.iter().position(|l| l.id == id)?;
        let mut ops = Ops::new();
        let before = self.layers[idx].clone();

        if let Some(target) = patch.layer_number
            && target != before.layer_number
        {
            let from = before.layer_number;
            if let Some(other) = self.layers.iter_mut().find(|l| l.layer_number == target) {
                other.layer_number = from;
                if !other.id.is_provisional() {
                    ops.push(RemoteOp::UpdateLayer {
                        id: other.id,
                        patch: LayerPatch {
                            layer_number: Some(from),
                            ..LayerPatch::default()
                        },
                    });
                }
            }
            for asset in &mut self.assets {
                if asset.layer_number == from {
                    asset.layer_number = target;
                } else if asset.layer_number == target {
                    asset.layer_number = from;
                }
            }
        }

        patch.apply(&mut self.layers[idx]);
        let sent = LayerPatch::diff(&before, &self.layers[idx]);
        // A swap always changes this layer's number, so an empty diff
        // means nothing moved at all.
        if sent.is_empty() {
            return None;
        }
        if !id.is_provisional() {
            ops.push(RemoteOp::UpdateLayer { id, patch: sent });
        }
        self.layers.sort_by_key(|l| l.layer_number);
        Some(ops)
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Make `target` the current state and describe the backend writes that
    /// bring the server along. Assets that must be re-created get fresh
    /// provisional ids, reported in `renamed`.
    pub fn restore(&mut self, target: &StoreSnapshot) -> Reconciled {
        let mut out = Reconciled::default();

        for layer in &target.layers {
            if let Some(current) = self.layer_by_id(layer.id) {
                let patch = LayerPatch::diff(current, layer);
                if !patch.is_empty() && !layer.id.is_provisional() {
                    out.ops.push(RemoteOp::UpdateLayer {
                        id: layer.id,
                        patch,
                    });
                }
            }
        }

        for current in &self.assets {
            let kept = target.assets.iter().any(|a| a.id == current.id);
            if !kept && !current.id.is_provisional() {
                out.ops.push(RemoteOp::DeleteAsset { id: current.id });
            }
        }

        let mut assets = Vec::with_capacity(target.assets.len());
        for wanted in &target.assets {
            let mut restored = wanted.clone();
            match self.asset(wanted.id) {
                Some(current) => {
                    let patch = AssetPatch::diff(current, wanted);
                    if !patch.is_empty() && !wanted.id.is_provisional() {
                        out.ops.push(RemoteOp::UpdateAsset {
                            id: wanted.id,
                            patch,
                        });
                    }
                }
                None => {
                    let layer_id = target
                        .layers
                        .iter()
                        .find(|l| l.layer_number == wanted.layer_number)
                        .map(|l| l.id)
                        .filter(|id| !id.is_provisional());
                    if let Some(layer_id) = layer_id {
                        restored.id = RecordId::provisional();
                        out.renamed.push((wanted.id, restored.id));
                        out.ops.push(RemoteOp::CreateAsset {
                            layer_id,
                            asset: restored.clone(),
                        });
                    } else {
                        warn!("cannot re-create asset {}: layer not persisted", wanted.id);
                    }
                }
            }
            assets.push(restored);
        }

        self.layers = target.layers.clone();
        self.assets = assets;
        self.media = target.media.clone();
        out
    }

    fn patch_asset(&mut self, id: RecordId, patch: &AssetPatch) -> Option<Ops> {
        let asset = self.assets.iter_mut().find(|a| a.id == id)?;
        let before = asset.clone();
        patch.apply(asset);
        let sent = AssetPatch::diff(&before, asset);
        if sent.is_empty() {
            return None;
        }

        let mut ops = Ops::new();
        if !id.is_provisional() {
            ops.push(RemoteOp::UpdateAsset { id, patch: sent });
        }
        Some(ops)
    }
}

/// Size for a newly dropped asset: intrinsic dimensions scaled to fit the
/// drop box, or the default square when unknown.
pub fn drop_size(media: Option<&MediaAsset>, config: &EditorConfig) -> (u32, u32) {
    let fallback = config.default_asset_size;
    let (w, h) = match media {
        Some(m) => (
            m.width.filter(|w| *w > 0).unwrap_or(fallback),
            m.height.filter(|h| *h > 0).unwrap_or(fallback),
        ),
        None => (fallback, fallback),
    };
    let max = config.max_drop_size;
    if w <= max && h <= max {
        return (w, h);
    }
    let ratio = (max as f64 / w as f64).min(max as f64 / h as f64);
    (
        ((w as f64 * ratio).round() as u32).max(1),
        ((h as f64 * ratio).round() as u32).max(1),
    )
}
