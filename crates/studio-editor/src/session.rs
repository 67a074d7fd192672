//! Editor session: one Layer Studio view's worth of state.
//!
//! Owns the store, grid snapper, undo history, selection, zoom and drag
//! gesture, and routes every mutation through the same path: apply to the
//! store, record a history snapshot, hand the resulting `RemoteOp`s to the
//! sink. Outcomes from the sink come back through
//! [`StudioSession::apply_outcome`].

use crate::history::History;
use crate::hit::hit_test;
use crate::input::{InputEvent, KeyEvent};
use crate::keyboard::{KeyBus, KeySubscription, KeyTarget, KeyboardRouter, ZOOM_MAX, ZOOM_MIN};
use crate::persist::{OpAck, OpLedger, OpOutcome, OpSink, Ops};
use crate::shortcuts::ShortcutAction;
use crate::store::{LayerStore, LoadedLayer, Reconciled, StoreSnapshot};
use crate::tools::{DragEffect, DragTool, Hit};
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use studio_core::config::EditorConfig;
use studio_core::id::RecordId;
use studio_core::model::*;
use studio_core::snap::GridSnapper;

/// Current layer and asset selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub layer: Option<LayerKind>,
    pub asset: Option<RecordId>,
}

type ConfirmFn = Box<dyn FnMut(&str) -> bool>;

pub struct StudioSession {
    config: EditorConfig,
    store: LayerStore,
    snapper: GridSnapper,
    history: History<StoreSnapshot>,
    selection: Selection,
    zoom: f32,
    ledger: OpLedger,
    sink: Box<dyn OpSink>,
    drag: DragTool,
    /// Asked before destructive keyboard actions. Defaults to always-yes.
    confirm: ConfirmFn,
    /// Set when a remote write failed; local state may have drifted.
    needs_reload: bool,
}

impl StudioSession {
    pub fn new(config: EditorConfig, sink: impl OpSink + 'static) -> Result<Self, ModelError> {
        let snapper = config.snapper()?;
        let history = History::new(StoreSnapshot::default(), config.max_history);
        let zoom = config.initial_zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        Ok(Self {
            config,
            store: LayerStore::new(),
            snapper,
            history,
            selection: Selection::default(),
            zoom,
            ledger: OpLedger::new(),
            sink: Box::new(sink),
            drag: DragTool::new(),
            confirm: Box::new(|_| true),
            needs_reload: false,
        })
    }

    /// Replace the confirmation prompt used before deleting assets.
    pub fn with_confirm(mut self, confirm: impl FnMut(&str) -> bool + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn snapper(&self) -> &GridSnapper {
        &self.snapper
    }

    pub fn history(&self) -> &History<StoreSnapshot> {
        &self.history
    }

    pub fn ledger(&self) -> &OpLedger {
        &self.ledger
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snapper.set_enabled(enabled);
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn needs_reload(&self) -> bool {
        self.needs_reload
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Replace local state with a fresh server fetch. The loaded state
    /// becomes the new history baseline.
    pub fn load(&mut self, scope: CompositionScope, fetched: Vec<LoadedLayer>, media: Vec<MediaAsset>) {
        self.drag.cancel();
        self.store.load(scope, fetched, media);
        self.history.clear(self.store.snapshot());
        self.ledger.clear_failures();
        self.needs_reload = false;
        self.prune_selection();
        debug!(
            "loaded {} layers, {} assets",
            self.store.layers().len(),
            self.store.assets().len()
        );
    }

    /// Load a different scene of the same episode.
    pub fn switch_scene(&mut self, scene: &Scene, fetched: Vec<LoadedLayer>, media: Vec<MediaAsset>) {
        let Some(scope) = self.store.scope() else {
            warn!("switch to scene {} before any episode was loaded", scene.id);
            return;
        };
        info!("switching to scene {} ({})", scene.scene_number, scene.name);
        self.selection = Selection::default();
        self.load(scope.with_scene(scene.id), fetched, media);
    }

    /// Create the five standard layers for an empty composition.
    pub fn initialize_layers(&mut self, scope: CompositionScope) -> bool {
        let Some(ops) = self.store.initialize(scope) else {
            return false;
        };
        self.history.clear(self.store.snapshot());
        self.submit(ops);
        true
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Drop a media asset onto a layer. `position` is in canvas pixels.
    pub fn drop_asset(
        &mut self,
        media_id: RecordId,
        layer: LayerKind,
        position: Option<(i32, i32)>,
    ) -> Option<RecordId> {
        let (id, ops) = self
            .store
            .drop_asset(media_id, layer, position, &self.snapper, &self.config)?;
        self.commit(ops);
        Some(id)
    }

    pub fn update_asset(&mut self, id: RecordId, patch: &AssetPatch) -> bool {
        match self.store.update_asset(id, patch, &self.snapper) {
            Some(ops) => self.commit(ops),
            None => false,
        }
    }

    pub fn nudge_asset(&mut self, id: RecordId, dx: i32, dy: i32) -> bool {
        match self.store.nudge_asset(id, dx, dy) {
            Some(ops) => self.commit(ops),
            None => false,
        }
    }

    pub fn remove_asset(&mut self, id: RecordId) -> bool {
        let Some(ops) = self.store.remove_asset(id) else {
            return false;
        };
        if self.selection.asset == Some(id) {
            self.selection.asset = None;
        }
        if self.drag.dragged() == Some(id) {
            self.drag.cancel();
        }
        self.commit(ops)
    }

    pub fn update_layer(&mut self, id: RecordId, patch: &LayerPatch) -> bool {
        let from = self.store.layer_by_id(id).map(|l| l.layer_number);
        let Some(ops) = self.store.update_layer(id, patch) else {
            return false;
        };
        // The selected layer follows its record through a reorder.
        if let (Some(from), Some(to)) = (from, patch.layer_number)
            && from != to
        {
            if self.selection.layer == Some(from) {
                self.selection.layer = Some(to);
            } else if self.selection.layer == Some(to) {
                self.selection.layer = Some(from);
            }
        }
        self.commit(ops)
    }

    /// Patch the layer currently holding `kind`.
    pub fn update_layer_kind(&mut self, kind: LayerKind, patch: &LayerPatch) -> bool {
        match self.store.layer(kind).map(|l| l.id) {
            Some(id) => self.update_layer(id, patch),
            None => false,
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let Some(target) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(&target);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(target) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(&target);
        true
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<ShortcutAction> {
        KeyboardRouter.dispatch(event, self)
    }

    pub fn handle_pointer(&mut self, event: &InputEvent) -> DragEffect {
        let hit = match event {
            InputEvent::PointerDown { x, y, .. } => self.hit_at(x / self.zoom, y / self.zoom),
            _ => None,
        };
        let effect = self.drag.handle(event, hit, self.zoom);
        match effect {
            DragEffect::Select { asset, layer } => {
                self.selection.asset = Some(asset);
                self.selection.layer = Some(layer);
            }
            DragEffect::Deselect => self.selection.asset = None,
            DragEffect::Move { asset, x, y } => {
                self.store.move_asset_live(asset, x, y);
            }
            DragEffect::Commit {
                asset,
                origin,
                x,
                y,
            } => {
                // Rewind the live preview so the committed patch is
                // relative to what the server holds.
                self.store.move_asset_live(asset, origin.0, origin.1);
                self.update_asset(asset, &AssetPatch::position(x, y));
            }
            DragEffect::None => {}
        }
        effect
    }

    /// Route global key events to this session until the subscription is
    /// dropped. Events arriving while the session is borrowed are dropped.
    pub fn attach_keyboard(session: &Rc<RefCell<Self>>, bus: &KeyBus) -> KeySubscription {
        let weak = Rc::downgrade(session);
        bus.subscribe(move |event| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            match session.try_borrow_mut() {
                Ok(mut s) => {
                    s.handle_key(event);
                }
                Err(_) => warn!("key {:?} dropped: session busy", event.key),
            }
        })
    }

    // ─── Remote outcomes ─────────────────────────────────────────────────

    pub fn apply_outcome(&mut self, outcome: OpOutcome) {
        if !self.ledger.complete(&outcome) {
            debug!("outcome for unknown op {}", outcome.seq);
            return;
        }
        match outcome.result {
            Ok(OpAck::Done) => {}
            Ok(OpAck::LayersCreated(layers)) => {
                let reconciled = self.store.acknowledge_layers(&layers);
                self.apply_reconciled(reconciled);
            }
            Ok(OpAck::AssetCreated { provisional, asset }) => {
                let reconciled = self.store.acknowledge_asset(provisional, &asset);
                self.apply_reconciled(reconciled);
            }
            Err(reason) => {
                warn!("op {} failed ({reason}); local state may be stale", outcome.seq);
                self.needs_reload = true;
            }
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Record the post-mutation state and persist. Always `true` so the
    /// mutators can return it directly.
    fn commit(&mut self, ops: Ops) -> bool {
        self.history.push_state(self.store.snapshot());
        self.submit(ops);
        true
    }

    fn submit(&mut self, ops: Ops) {
        for op in ops {
            let pending = self.ledger.record(op);
            let seq = pending.seq;
            let label = pending.op.label();
            if self.sink.submit(pending) {
                self.ledger.mark_submitted(seq);
            } else {
                error!("{label} (op {seq}) could not be queued");
                self.ledger.mark_failed(seq, "persistence queue closed");
                self.needs_reload = true;
            }
        }
    }

    fn restore(&mut self, target: &StoreSnapshot) {
        self.drag.cancel();
        let reconciled = self.store.restore(target);
        self.apply_reconciled(reconciled);
        self.prune_selection();
    }

    fn apply_reconciled(&mut self, reconciled: Reconciled) {
        for &(from, to) in &reconciled.renamed {
            self.history.update_all(|s| s.rename(from, to));
            if self.selection.asset == Some(from) {
                self.selection.asset = Some(to);
            }
            self.drag.rename(from, to);
        }
        self.submit(reconciled.ops);
    }

    fn prune_selection(&mut self) {
        if let Some(id) = self.selection.asset
            && self.store.asset(id).is_none()
        {
            self.selection.asset = None;
        }
    }

    fn hit_at(&self, cx: f32, cy: f32) -> Option<Hit> {
        let (asset, layer) = hit_test(&self.store, cx, cy, self.config.default_asset_size)?;
        let placed = self.store.asset(asset)?;
        Some(Hit {
            asset,
            layer,
            origin: (placed.position_x, placed.position_y),
            locked: self.store.layer(layer).is_some_and(|l| l.is_locked),
        })
    }
}

impl KeyTarget for StudioSession {
    fn selected_layer(&self) -> Option<LayerKind> {
        self.selection.layer
    }

    fn selected_asset(&self) -> Option<RecordId> {
        self.selection.asset
    }

    fn select_layer(&mut self, layer: LayerKind) {
        self.selection.layer = Some(layer);
    }

    fn toggle_layer_visibility(&mut self, layer: LayerKind) {
        let Some(current) = self.store.layer(layer) else {
            return;
        };
        let patch = LayerPatch {
            is_visible: Some(!current.is_visible),
            ..LayerPatch::default()
        };
        self.update_layer_kind(layer, &patch);
    }

    fn toggle_layer_lock(&mut self, layer: LayerKind) {
        let Some(current) = self.store.layer(layer) else {
            return;
        };
        let patch = LayerPatch {
            is_locked: Some(!current.is_locked),
            ..LayerPatch::default()
        };
        self.update_layer_kind(layer, &patch);
    }

    fn confirm(&mut self, message: &str) -> bool {
        (self.confirm)(message)
    }

    fn remove_asset(&mut self, id: RecordId) {
        StudioSession::remove_asset(self, id);
    }

    fn nudge_asset(&mut self, id: RecordId, dx: i32, dy: i32) {
        StudioSession::nudge_asset(self, id, dx, dy);
    }

    fn zoom(&self) -> f32 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f32) {
        StudioSession::set_zoom(self, zoom);
    }

    fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    fn undo(&mut self) {
        StudioSession::undo(self);
    }

    fn redo(&mut self) {
        StudioSession::redo(self);
    }
}
