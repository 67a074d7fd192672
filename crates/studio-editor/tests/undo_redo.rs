//! Integration tests: session history (studio-editor).
//!
//! Drives `StudioSession` the way a view would and checks both the local
//! state after undo/redo and the backend writes that bring the server along.

use pretty_assertions::assert_eq;
use studio_core::config::EditorConfig;
use studio_core::id::RecordId;
use studio_core::model::*;
use studio_editor::input::InputEvent;
use studio_editor::persist::{OpAck, OpOutcome, RecordingSink, RemoteOp};
use studio_editor::session::StudioSession;
use studio_editor::store::LoadedLayer;
use studio_editor::tools::DragEffect;

fn placed(id: &str, kind: LayerKind, x: i32, y: i32) -> PositionedAsset {
    let mut a = PositionedAsset::new(RecordId::intern(id), RecordId::intern("media-1"), kind);
    a.position_x = x;
    a.position_y = y;
    a.width = Some(400);
    a.height = Some(400);
    a
}

fn session_with(assets: Vec<PositionedAsset>) -> (StudioSession, RecordingSink) {
    let sink = RecordingSink::new();
    let mut session = StudioSession::new(EditorConfig::default(), sink.clone()).unwrap();
    let fetched = LayerKind::ALL
        .iter()
        .map(|&kind| LoadedLayer {
            layer: Layer::new(RecordId::intern(&format!("undo-layer-{}", kind.number())), kind),
            assets: assets
                .iter()
                .filter(|a| a.layer_number == kind)
                .cloned()
                .collect(),
        })
        .collect();
    session.load(
        CompositionScope::episode(RecordId::intern("undo-ep")),
        fetched,
        vec![],
    );
    (session, sink)
}

fn ops(sink: &RecordingSink) -> Vec<RemoteOp> {
    sink.take().into_iter().map(|p| p.op).collect()
}

// ─── Basic undo/redo ────────────────────────────────────────────────────

#[test]
fn undo_restores_previous_position() {
    let (mut session, sink) = session_with(vec![placed("a1", LayerKind::Assets, 100, 100)]);
    let id = RecordId::intern("a1");

    assert!(session.update_asset(id, &AssetPatch::position(223, 177)));
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::UpdateAsset {
            id,
            patch: AssetPatch::position(200, 200),
        }]
    );

    assert!(session.undo());
    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (100, 100));
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::UpdateAsset {
            id,
            patch: AssetPatch::position(100, 100),
        }]
    );

    assert!(session.redo());
    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (200, 200));
}

#[test]
fn undo_at_baseline_does_nothing() {
    let (mut session, sink) = session_with(vec![]);
    assert!(!session.undo());
    assert!(!session.redo());
    assert!(sink.is_empty());
}

#[test]
fn new_edit_discards_redo_branch() {
    let (mut session, _sink) = session_with(vec![placed("a2", LayerKind::Assets, 0, 0)]);
    let id = RecordId::intern("a2");
    session.nudge_asset(id, 1, 0);
    session.nudge_asset(id, 1, 0);
    session.undo();
    assert!(session.can_redo());

    session.nudge_asset(id, 0, 5);
    assert!(!session.can_redo());
    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (1, 5));
}

// ─── Remove / re-create ─────────────────────────────────────────────────

#[test]
fn undo_remove_recreates_asset_under_new_id() {
    let (mut session, sink) = session_with(vec![placed("a3", LayerKind::Text, 50, 50)]);
    let id = RecordId::intern("a3");

    assert!(session.remove_asset(id));
    assert_eq!(ops(&sink), vec![RemoteOp::DeleteAsset { id }]);

    assert!(session.undo());
    let pending = sink.take();
    assert_eq!(pending.len(), 1);
    let (seq, recreated) = match &pending[0].op {
        RemoteOp::CreateAsset { layer_id, asset } => {
            assert_eq!(*layer_id, RecordId::intern("undo-layer-4"));
            assert!(asset.id.is_provisional());
            assert_eq!((asset.position_x, asset.position_y), (50, 50));
            (pending[0].seq, asset.clone())
        }
        other => panic!("expected CreateAsset, got {other:?}"),
    };
    assert!(session.store().asset(recreated.id).is_some());

    let mut server = recreated.clone();
    server.id = RecordId::intern("a3-again");
    session.apply_outcome(OpOutcome {
        seq,
        result: Ok(OpAck::AssetCreated {
            provisional: recreated.id,
            asset: server,
        }),
    });
    assert!(session.store().asset(RecordId::intern("a3-again")).is_some());

    // Redo deletes the re-created record, not the record removed earlier.
    assert!(session.redo());
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::DeleteAsset {
            id: RecordId::intern("a3-again")
        }]
    );
}

#[test]
fn removing_unacknowledged_drop_sends_delete_after_creation() {
    let (mut session, sink) = session_with(vec![]);
    let id = session
        .drop_asset(RecordId::intern("media-1"), LayerKind::Assets, Some((10, 10)))
        .unwrap();
    let create = sink.take().remove(0);

    assert!(session.remove_asset(id));
    assert!(sink.is_empty(), "provisional records are never deleted remotely");

    let RemoteOp::CreateAsset { asset, .. } = create.op else {
        panic!("expected CreateAsset");
    };
    let mut server = asset;
    server.id = RecordId::intern("late-create");
    session.apply_outcome(OpOutcome {
        seq: create.seq,
        result: Ok(OpAck::AssetCreated {
            provisional: id,
            asset: server,
        }),
    });
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::DeleteAsset {
            id: RecordId::intern("late-create")
        }]
    );
}

// ─── Drag ───────────────────────────────────────────────────────────────

#[test]
fn drag_commits_one_snapped_history_entry() {
    let (mut session, sink) = session_with(vec![placed("a4", LayerKind::Assets, 100, 100)]);
    let id = RecordId::intern("a4");
    assert_eq!(session.zoom(), 0.5);

    // Screen (60, 60) is canvas (120, 120).
    let select = session.handle_pointer(&InputEvent::down(60.0, 60.0));
    assert_eq!(
        select,
        DragEffect::Select {
            asset: id,
            layer: LayerKind::Assets
        }
    );
    assert_eq!(session.selection().asset, Some(id));

    session.handle_pointer(&InputEvent::moved(70.0, 65.0));
    session.handle_pointer(&InputEvent::moved(75.0, 70.0));
    let live = session.store().asset(id).unwrap();
    assert_eq!((live.position_x, live.position_y), (130, 120));
    assert!(sink.is_empty(), "live moves are not persisted");

    session.handle_pointer(&InputEvent::up(75.0, 70.0));
    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (150, 100));
    assert_eq!(session.history().len(), 2);
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::UpdateAsset {
            id,
            patch: AssetPatch {
                position_x: Some(150),
                ..AssetPatch::default()
            },
        }]
    );

    session.undo();
    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (100, 100));
}

#[test]
fn drag_that_snaps_back_to_origin_records_nothing() {
    let (mut session, sink) = session_with(vec![placed("a6", LayerKind::Assets, 100, 100)]);
    let id = RecordId::intern("a6");

    // +10 canvas px on x, which snaps back onto 100.
    session.handle_pointer(&InputEvent::down(60.0, 60.0));
    session.handle_pointer(&InputEvent::moved(65.0, 60.0));
    assert_eq!(session.store().asset(id).unwrap().position_x, 110);
    session.handle_pointer(&InputEvent::up(65.0, 60.0));

    let asset = session.store().asset(id).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (100, 100));
    assert_eq!(session.history().len(), 1);
    assert!(!session.can_undo());
    assert!(sink.is_empty());
}

#[test]
fn locked_layer_assets_do_not_drag() {
    let (mut session, sink) = session_with(vec![placed("a5", LayerKind::Assets, 0, 0)]);
    session.update_layer_kind(
        LayerKind::Assets,
        &LayerPatch {
            is_locked: Some(true),
            ..LayerPatch::default()
        },
    );
    sink.take();

    session.handle_pointer(&InputEvent::down(10.0, 10.0));
    session.handle_pointer(&InputEvent::moved(100.0, 100.0));
    session.handle_pointer(&InputEvent::up(100.0, 100.0));

    let asset = session.store().asset(RecordId::intern("a5")).unwrap();
    assert_eq!((asset.position_x, asset.position_y), (0, 0));
    assert!(sink.is_empty());
}

// ─── Layers ─────────────────────────────────────────────────────────────

#[test]
fn undo_layer_toggle_sends_inverse_patch() {
    let (mut session, sink) = session_with(vec![]);
    let id = RecordId::intern("undo-layer-2");
    session.update_layer(
        id,
        &LayerPatch {
            is_visible: Some(false),
            ..LayerPatch::default()
        },
    );
    sink.take();

    session.undo();
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::UpdateLayer {
            id,
            patch: LayerPatch {
                is_visible: Some(true),
                ..LayerPatch::default()
            },
        }]
    );
    assert!(session.store().layer(LayerKind::Footage).unwrap().is_visible);
}

#[test]
fn initialized_layers_adopt_server_ids() {
    let sink = RecordingSink::new();
    let mut session = StudioSession::new(EditorConfig::default(), sink.clone()).unwrap();
    let scope = CompositionScope::episode(RecordId::intern("fresh-ep"));
    assert!(session.initialize_layers(scope));
    assert!(!session.initialize_layers(scope));

    let pending = sink.take();
    assert_eq!(pending.len(), 1);
    let RemoteOp::CreateLayers { provisional, .. } = &pending[0].op else {
        panic!("expected CreateLayers");
    };
    assert_eq!(provisional.len(), 5);

    // Hide the text layer before the server answers.
    session.update_layer_kind(
        LayerKind::Text,
        &LayerPatch {
            is_visible: Some(false),
            ..LayerPatch::default()
        },
    );
    assert!(sink.is_empty());

    let created: Vec<Layer> = LayerKind::ALL
        .iter()
        .map(|&k| Layer::new(RecordId::intern(&format!("srv-layer-{}", k.number())), k))
        .collect();
    session.apply_outcome(OpOutcome {
        seq: pending[0].seq,
        result: Ok(OpAck::LayersCreated(created)),
    });

    assert_eq!(
        session.store().layer(LayerKind::Text).unwrap().id,
        RecordId::intern("srv-layer-4")
    );
    assert_eq!(
        ops(&sink),
        vec![RemoteOp::UpdateLayer {
            id: RecordId::intern("srv-layer-4"),
            patch: LayerPatch {
                is_visible: Some(false),
                ..LayerPatch::default()
            },
        }]
    );
    assert_eq!(session.ledger().pending_count(), 1);
}
