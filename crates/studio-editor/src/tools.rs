//! Canvas drag tool.
//!
//! Translates pointer events into selection changes and asset moves. The
//! tool only tracks gesture state; the session applies its `DragEffect`s.
//!
//! Pointer coordinates arrive in screen pixels and are divided by the
//! current zoom, so a 10px mouse move at 0.5× zoom moves the asset 20px.
//! Moves are applied live without snapping; the release commits a single
//! snapped position.

use crate::input::InputEvent;
use studio_core::id::RecordId;
use studio_core::model::LayerKind;

/// What the session should do in response to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragEffect {
    None,
    /// Pointer went down on an asset; select it (and its layer).
    Select { asset: RecordId, layer: LayerKind },
    /// Pointer went down on empty canvas.
    Deselect,
    /// Live reposition during the gesture.
    Move { asset: RecordId, x: i32, y: i32 },
    /// Gesture ended after moving; commit the final position. `origin` is
    /// where the asset was before the gesture (what the server still has).
    Commit {
        asset: RecordId,
        origin: (i32, i32),
        x: i32,
        y: i32,
    },
}

/// Hit information the session resolves before handing an event over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub asset: RecordId,
    pub layer: LayerKind,
    /// Asset position at pointer-down.
    pub origin: (i32, i32),
    /// Locked layers can be selected but not dragged.
    pub locked: bool,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    asset: RecordId,
    origin: (i32, i32),
    start: (f32, f32),
    current: (i32, i32),
}

#[derive(Debug, Default)]
pub struct DragTool {
    gesture: Option<Gesture>,
}

impl DragTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// The asset being dragged, if any.
    pub fn dragged(&self) -> Option<RecordId> {
        self.gesture.map(|g| g.asset)
    }

    /// Abandon the current gesture without committing.
    pub fn cancel(&mut self) {
        self.gesture = None;
    }

    /// Follow an id change of the dragged asset.
    pub fn rename(&mut self, from: RecordId, to: RecordId) {
        if let Some(g) = self.gesture.as_mut()
            && g.asset == from
        {
            g.asset = to;
        }
    }

    /// Handle one pointer event. `hit` is only consulted on pointer-down.
    pub fn handle(&mut self, event: &InputEvent, hit: Option<Hit>, zoom: f32) -> DragEffect {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                self.gesture = None;
                let Some(hit) = hit else {
                    return DragEffect::Deselect;
                };
                if !hit.locked {
                    self.gesture = Some(Gesture {
                        asset: hit.asset,
                        origin: hit.origin,
                        start: (*x, *y),
                        current: hit.origin,
                    });
                }
                DragEffect::Select {
                    asset: hit.asset,
                    layer: hit.layer,
                }
            }
            InputEvent::PointerMove { x, y, modifiers } => {
                let Some(gesture) = self.gesture.as_mut() else {
                    return DragEffect::None;
                };
                let mut dx = (x - gesture.start.0) / zoom;
                let mut dy = (y - gesture.start.1) / zoom;

                // Shift: constrain to dominant axis
                if modifiers.shift {
                    if dx.abs() > dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }

                let next = (
                    gesture.origin.0.saturating_add(dx.round() as i32),
                    gesture.origin.1.saturating_add(dy.round() as i32),
                );
                if next == gesture.current {
                    return DragEffect::None;
                }
                gesture.current = next;
                DragEffect::Move {
                    asset: gesture.asset,
                    x: next.0,
                    y: next.1,
                }
            }
            InputEvent::PointerUp { .. } => match self.gesture.take() {
                Some(g) if g.current != g.origin => DragEffect::Commit {
                    asset: g.asset,
                    origin: g.origin,
                    x: g.current.0,
                    y: g.current.1,
                },
                _ => DragEffect::None,
            },
            InputEvent::Key(_) => DragEffect::None,
        }
    }
}
