//! Integration tests: keyboard shortcuts routed into a live session.

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use studio_core::config::EditorConfig;
use studio_core::id::RecordId;
use studio_core::model::*;
use studio_editor::input::{FocusTarget, KeyEvent, Modifiers};
use studio_editor::keyboard::KeyBus;
use studio_editor::persist::{RecordingSink, RemoteOp};
use studio_editor::session::StudioSession;
use studio_editor::shortcuts::ShortcutAction;
use studio_editor::store::LoadedLayer;

const CTRL: Modifiers = Modifiers {
    shift: false,
    ctrl: true,
    alt: false,
    meta: false,
};

fn session() -> (StudioSession, RecordingSink, RecordId) {
    let sink = RecordingSink::new();
    let mut session = StudioSession::new(EditorConfig::default(), sink.clone()).unwrap();
    let asset_id = RecordId::intern("kb-asset");
    let mut asset = PositionedAsset::new(asset_id, RecordId::intern("kb-media"), LayerKind::Assets);
    asset.position_x = 100;
    asset.position_y = 100;
    let fetched = LayerKind::ALL
        .iter()
        .map(|&kind| LoadedLayer {
            layer: Layer::new(RecordId::intern(&format!("kb-layer-{}", kind.number())), kind),
            assets: if kind == LayerKind::Assets {
                vec![asset.clone()]
            } else {
                vec![]
            },
        })
        .collect();
    session.load(
        CompositionScope::episode(RecordId::intern("kb-ep")),
        fetched,
        vec![],
    );
    (session, sink, asset_id)
}

fn select(session: &mut StudioSession, id: RecordId) {
    session.handle_key(&KeyEvent::plain("3"));
    // Click the asset: canvas (110, 110) at the initial 0.5× zoom.
    session.handle_pointer(&studio_editor::InputEvent::down(55.0, 55.0));
    session.handle_pointer(&studio_editor::InputEvent::up(55.0, 55.0));
    assert_eq!(session.selection().asset, Some(id));
}

fn position(session: &StudioSession, id: RecordId) -> (i32, i32) {
    let a = session.store().asset(id).unwrap();
    (a.position_x, a.position_y)
}

#[test]
fn digit_selects_layer() {
    let (mut session, _, _) = session();
    let action = session.handle_key(&KeyEvent::plain("3"));
    assert_eq!(action, Some(ShortcutAction::SelectLayer(LayerKind::Assets)));
    assert_eq!(session.selection().layer, Some(LayerKind::Assets));
}

#[test]
fn arrows_nudge_without_snapping() {
    let (mut session, sink, id) = session();
    select(&mut session, id);

    session.handle_key(&KeyEvent::new("ArrowRight", Modifiers::SHIFT));
    assert_eq!(position(&session, id), (110, 100));

    session.handle_key(&KeyEvent::plain("ArrowRight"));
    assert_eq!(position(&session, id), (111, 100));

    session.handle_key(&KeyEvent::plain("ArrowUp"));
    assert_eq!(position(&session, id), (111, 99));

    let sent: Vec<RemoteOp> = sink.take().into_iter().map(|p| p.op).collect();
    assert_eq!(sent.len(), 3);
}

#[test]
fn single_nudge_from_origin() {
    let (mut session, _, id) = session();
    select(&mut session, id);
    session.handle_key(&KeyEvent::plain("ArrowRight"));
    assert_eq!(position(&session, id), (101, 100));
}

#[test]
fn nudge_without_selection_is_ignored() {
    let (mut session, sink, id) = session();
    assert_eq!(session.handle_key(&KeyEvent::plain("ArrowLeft")), None);
    assert_eq!(position(&session, id), (100, 100));
    assert!(sink.is_empty());
}

#[test]
fn text_fields_swallow_shortcuts() {
    let (mut session, _, _) = session();
    let event = KeyEvent::plain("3").in_focus(FocusTarget::TextInput);
    assert_eq!(session.handle_key(&event), None);
    assert_eq!(session.selection().layer, None);
}

#[test]
fn v_and_l_toggle_the_selected_layer() {
    let (mut session, sink, _) = session();
    assert_eq!(session.handle_key(&KeyEvent::plain("v")), None);

    session.handle_key(&KeyEvent::plain("2"));
    session.handle_key(&KeyEvent::plain("v"));
    session.handle_key(&KeyEvent::plain("l"));
    let footage = session.store().layer(LayerKind::Footage).unwrap();
    assert!(!footage.is_visible);
    assert!(footage.is_locked);
    assert_eq!(sink.len(), 2);
}

#[test]
fn selection_follows_reordered_layer() {
    let (mut session, _, _) = session();
    session.handle_key(&KeyEvent::plain("2"));
    session.update_layer_kind(
        LayerKind::Footage,
        &LayerPatch {
            layer_number: Some(LayerKind::Text),
            ..LayerPatch::default()
        },
    );
    assert_eq!(session.selection().layer, Some(LayerKind::Text));

    session.handle_key(&KeyEvent::plain("v"));
    let moved = session.store().layer(LayerKind::Text).unwrap();
    assert_eq!(moved.id, RecordId::intern("kb-layer-2"));
    assert!(!moved.is_visible);
    assert!(session.store().layer(LayerKind::Footage).unwrap().is_visible);
}

#[test]
fn arrows_leave_assets_on_locked_layers() {
    let (mut session, sink, id) = session();
    select(&mut session, id);
    session.handle_key(&KeyEvent::plain("l"));
    assert!(session.store().layer(LayerKind::Assets).unwrap().is_locked);
    sink.take();
    let entries = session.history().len();

    session.handle_key(&KeyEvent::plain("ArrowRight"));
    session.handle_key(&KeyEvent::new("ArrowDown", Modifiers::SHIFT));
    assert_eq!(position(&session, id), (100, 100));
    assert_eq!(session.history().len(), entries);
    assert!(sink.is_empty());
}

#[test]
fn command_d_needs_a_selected_asset_and_changes_nothing() {
    let (mut session, sink, id) = session();
    assert_eq!(session.handle_key(&KeyEvent::new("d", CTRL)), None);

    select(&mut session, id);
    let meta = Modifiers {
        meta: true,
        ..Modifiers::default()
    };
    assert_eq!(
        session.handle_key(&KeyEvent::new("d", CTRL)),
        Some(ShortcutAction::DuplicateAsset)
    );
    assert_eq!(
        session.handle_key(&KeyEvent::new("D", meta)),
        Some(ShortcutAction::DuplicateAsset)
    );

    assert_eq!(session.store().assets().len(), 1);
    assert_eq!(position(&session, id), (100, 100));
    assert_eq!(session.history().len(), 1);
    assert!(!session.can_undo());
    assert!(sink.is_empty());
}

#[test]
fn delete_respects_confirmation() {
    let (session, sink, id) = session();
    let mut session = session.with_confirm(|_| false);
    select(&mut session, id);
    assert_eq!(session.handle_key(&KeyEvent::plain("Delete")), None);
    assert!(session.store().asset(id).is_some());

    let mut session = session.with_confirm(|_| true);
    assert_eq!(
        session.handle_key(&KeyEvent::plain("Backspace")),
        Some(ShortcutAction::DeleteAsset)
    );
    assert!(session.store().asset(id).is_none());
    assert_eq!(session.selection().asset, None);
    assert_eq!(
        sink.take().into_iter().map(|p| p.op).collect::<Vec<_>>(),
        vec![RemoteOp::DeleteAsset { id }]
    );
}

#[test]
fn command_z_undoes_and_redoes() {
    let (mut session, _, id) = session();
    select(&mut session, id);
    session.handle_key(&KeyEvent::plain("ArrowDown"));
    assert_eq!(position(&session, id), (100, 101));

    session.handle_key(&KeyEvent::new("z", CTRL));
    assert_eq!(position(&session, id), (100, 100));

    session.handle_key(&KeyEvent::new(
        "z",
        Modifiers {
            shift: true,
            ..CTRL
        },
    ));
    assert_eq!(position(&session, id), (100, 101));

    session.handle_key(&KeyEvent::new("z", CTRL));
    session.handle_key(&KeyEvent::new("y", CTRL));
    assert_eq!(position(&session, id), (100, 101));
}

#[test]
fn zoom_keys_step_and_reset() {
    let (mut session, _, _) = session();
    session.handle_key(&KeyEvent::plain("+"));
    assert_eq!(session.zoom(), 0.75);
    session.handle_key(&KeyEvent::plain("-"));
    session.handle_key(&KeyEvent::plain("-"));
    assert_eq!(session.zoom(), 0.25);
    session.handle_key(&KeyEvent::plain("-"));
    assert_eq!(session.zoom(), 0.25);
    session.handle_key(&KeyEvent::plain("0"));
    assert_eq!(session.zoom(), 1.0);
}

#[test]
fn escape_clears_selection() {
    let (mut session, _, id) = session();
    select(&mut session, id);
    session.handle_key(&KeyEvent::plain("Escape"));
    assert_eq!(session.selection().asset, None);
    assert_eq!(session.selection().layer, None);
}

// ─── Key bus ────────────────────────────────────────────────────────────

#[test]
fn attached_session_receives_bus_events_until_dropped() {
    let (session, _, _) = session();
    let session = Rc::new(RefCell::new(session));
    let bus = KeyBus::new();

    let subscription = StudioSession::attach_keyboard(&session, &bus);
    bus.emit(&KeyEvent::plain("4"));
    assert_eq!(session.borrow().selection().layer, Some(LayerKind::Text));

    drop(subscription);
    assert_eq!(bus.listener_count(), 0);
    bus.emit(&KeyEvent::plain("1"));
    assert_eq!(session.borrow().selection().layer, Some(LayerKind::Text));
}

#[test]
fn events_for_a_dropped_session_are_ignored() {
    let (session, _, _) = session();
    let session = Rc::new(RefCell::new(session));
    let bus = KeyBus::new();
    let subscription = StudioSession::attach_keyboard(&session, &bus);
    drop(session);
    bus.emit(&KeyEvent::plain("4"));
    assert!(subscription.is_attached());
}
