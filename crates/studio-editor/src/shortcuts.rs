//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Resolution is
//! pure; preconditions (is anything selected?) are checked by the router.

use crate::input::Modifiers;
use studio_core::model::LayerKind;

/// Pixels moved by an arrow key, and with Shift held.
pub const NUDGE_STEP: i32 = 1;
pub const NUDGE_STEP_LARGE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Layers ──
    SelectLayer(LayerKind),
    ToggleLayerVisibility,
    ToggleLayerLock,

    // ── Assets ──
    DeleteAsset,
    DuplicateAsset,
    Nudge { dx: i32, dy: i32 },

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,

    // ── Edit ──
    Undo,
    Redo,
    ClearSelection,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action, or `None` if the combo is unbound.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();

        // ── Command combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "d" | "D" => Some(ShortcutAction::DuplicateAsset),
                _ => None,
            };
        }

        // Arrows honour Shift as the large-step modifier.
        let step = if modifiers.shift {
            NUDGE_STEP_LARGE
        } else {
            NUDGE_STEP
        };
        let nudge = match key {
            "ArrowLeft" => Some((-step, 0)),
            "ArrowRight" => Some((step, 0)),
            "ArrowUp" => Some((0, -step)),
            "ArrowDown" => Some((0, step)),
            _ => None,
        };
        if let Some((dx, dy)) = nudge {
            return Some(ShortcutAction::Nudge { dx, dy });
        }

        // `+` arrives with Shift on most layouts.
        match key {
            "+" | "=" => return Some(ShortcutAction::ZoomIn),
            "-" => return Some(ShortcutAction::ZoomOut),
            _ => {}
        }

        if modifiers.alt {
            return None;
        }

        if !modifiers.shift
            && let Some(layer) = layer_digit(key)
        {
            return Some(ShortcutAction::SelectLayer(layer));
        }

        match key {
            "0" => Some(ShortcutAction::ZoomReset),
            "v" | "V" => Some(ShortcutAction::ToggleLayerVisibility),
            "l" | "L" => Some(ShortcutAction::ToggleLayerLock),
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteAsset),
            "Escape" => Some(ShortcutAction::ClearSelection),
            _ => None,
        }
    }
}

fn layer_digit(key: &str) -> Option<LayerKind> {
    match key {
        "1" | "2" | "3" | "4" | "5" => key
            .parse::<i64>()
            .ok()
            .and_then(|n| LayerKind::from_number(n).ok()),
        _ => None,
    }
}
