//! Keyboard command routing and scoped key subscriptions.
//!
//! `KeyboardRouter` turns a key event into at most one mutation on a
//! `KeyTarget`. `KeyBus` is the host's global key source; views subscribe
//! for as long as they are mounted and the returned `KeySubscription`
//! detaches the listener when dropped.

use crate::input::KeyEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use studio_core::id::RecordId;
use studio_core::model::LayerKind;

pub const ZOOM_STEP: f32 = 0.25;
pub const ZOOM_MIN: f32 = 0.25;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_DEFAULT: f32 = 1.0;

/// What the router needs from the owning view: current selection, zoom,
/// and the mutation callbacks it may invoke.
pub trait KeyTarget {
    fn selected_layer(&self) -> Option<LayerKind>;
    fn selected_asset(&self) -> Option<RecordId>;

    fn select_layer(&mut self, layer: LayerKind);
    fn toggle_layer_visibility(&mut self, layer: LayerKind);
    fn toggle_layer_lock(&mut self, layer: LayerKind);

    /// Blocking confirmation for destructive actions.
    fn confirm(&mut self, message: &str) -> bool;
    fn remove_asset(&mut self, id: RecordId);
    fn nudge_asset(&mut self, id: RecordId, dx: i32, dy: i32);

    /// Duplication has no backend support yet.
    fn duplicate_asset(&mut self, id: RecordId) {
        info!("duplicate requested for asset {id}; not implemented");
    }

    fn zoom(&self) -> f32;
    fn set_zoom(&mut self, zoom: f32);

    fn clear_selection(&mut self);

    fn undo(&mut self);
    fn redo(&mut self);
}

/// Stateless dispatcher from key events to `KeyTarget` calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyboardRouter;

impl KeyboardRouter {
    /// Route one keydown. Returns the action that was carried out, or `None`
    /// if the event came from a text field, had no binding, or its
    /// precondition (a selected layer/asset) was not met.
    pub fn dispatch(&self, event: &KeyEvent, target: &mut dyn KeyTarget) -> Option<ShortcutAction> {
        if event.focus.is_text_entry() {
            return None;
        }
        let action = ShortcutMap::resolve(&event.key, event.modifiers)?;

        match action {
            ShortcutAction::SelectLayer(layer) => target.select_layer(layer),
            ShortcutAction::ToggleLayerVisibility => {
                let layer = target.selected_layer()?;
                target.toggle_layer_visibility(layer);
            }
            ShortcutAction::ToggleLayerLock => {
                let layer = target.selected_layer()?;
                target.toggle_layer_lock(layer);
            }
            ShortcutAction::DeleteAsset => {
                let id = target.selected_asset()?;
                if !target.confirm("Remove this asset from the layer?") {
                    return None;
                }
                target.remove_asset(id);
            }
            ShortcutAction::DuplicateAsset => {
                let id = target.selected_asset()?;
                target.duplicate_asset(id);
            }
            ShortcutAction::Nudge { dx, dy } => {
                let id = target.selected_asset()?;
                target.nudge_asset(id, dx, dy);
            }
            ShortcutAction::ZoomIn => target.set_zoom(zoom_in(target.zoom())),
            ShortcutAction::ZoomOut => target.set_zoom(zoom_out(target.zoom())),
            ShortcutAction::ZoomReset => target.set_zoom(ZOOM_DEFAULT),
            ShortcutAction::Undo => target.undo(),
            ShortcutAction::Redo => target.redo(),
            ShortcutAction::ClearSelection => target.clear_selection(),
        }

        debug!("key {:?} -> {action:?}", event.key);
        Some(action)
    }
}

pub fn zoom_in(zoom: f32) -> f32 {
    (zoom + ZOOM_STEP).min(ZOOM_MAX)
}

pub fn zoom_out(zoom: f32) -> f32 {
    (zoom - ZOOM_STEP).max(ZOOM_MIN)
}

// ─── Key bus ─────────────────────────────────────────────────────────────

type Listener = Rc<RefCell<dyn FnMut(&KeyEvent)>>;
type ListenerList = RefCell<Vec<(u64, Listener)>>;

/// Single-threaded source of global key events.
#[derive(Default)]
pub struct KeyBus {
    listeners: Rc<ListenerList>,
    next_id: Cell<u64>,
}

impl KeyBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener. It stays attached until the returned subscription
    /// is dropped.
    #[must_use = "dropping the subscription detaches the listener immediately"]
    pub fn subscribe(&self, listener: impl FnMut(&KeyEvent) + 'static) -> KeySubscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().push((id, listener));
        KeySubscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Deliver an event to every attached listener, in subscription order.
    /// Listeners may subscribe or unsubscribe while the event is delivered.
    pub fn emit(&self, event: &KeyEvent) {
        let snapshot: Vec<(u64, Listener)> = self.listeners.borrow().clone();
        for (id, listener) in snapshot {
            let still_attached = self.listeners.borrow().iter().any(|(l, _)| *l == id);
            if !still_attached {
                continue;
            }
            // A listener that re-enters emit() is skipped rather than
            // double-borrowed.
            if let Ok(mut f) = listener.try_borrow_mut() {
                (&mut *f)(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

/// Keeps a `KeyBus` listener attached; detaches on drop.
pub struct KeySubscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl KeySubscription {
    pub fn is_attached(&self) -> bool {
        self.listeners
            .upgrade()
            .is_some_and(|l| l.borrow().iter().any(|(id, _)| *id == self.id))
    }
}

impl Drop for KeySubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}
