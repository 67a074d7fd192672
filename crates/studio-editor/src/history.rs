//! Linear undo/redo history over whole-state snapshots.
//!
//! Unlike an inverse-command stack, every entry is a complete state. The
//! pointer marks the current entry; undo and redo just move it. Pushing
//! while the pointer is behind the tip discards the redo branch.

use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Bounded snapshot history. Invariant: `pointer < entries.len()`.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    pointer: usize,
    max_history: usize,
}

impl<T> History<T> {
    /// Start a history whose only entry is `initial`. A `max_history` of 0
    /// is treated as 1 since the current state is always kept.
    pub fn new(initial: T, max_history: usize) -> Self {
        let max_history = max_history.max(1);
        let mut entries = VecDeque::with_capacity(max_history.min(64));
        entries.push_back(initial);
        Self {
            entries,
            pointer: 0,
            max_history,
        }
    }

    /// Record a new current state. Drops everything after the pointer, then
    /// evicts the oldest entries once the history exceeds its bound.
    pub fn push_state(&mut self, state: T) {
        self.entries.truncate(self.pointer + 1);
        self.entries.push_back(state);
        self.pointer = self.entries.len() - 1;

        while self.entries.len() > self.max_history {
            self.entries.pop_front();
            self.pointer = self.pointer.saturating_sub(1);
        }
    }

    /// Step back one entry and return it, or `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.pointer -= 1;
        self.entries.get(self.pointer)
    }

    /// Step forward one entry and return it, or `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.pointer += 1;
        self.entries.get(self.pointer)
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    pub fn current(&self) -> &T {
        &self.entries[self.pointer]
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Forget everything and start over from `state`.
    pub fn clear(&mut self, state: T) {
        self.entries.clear();
        self.entries.push_back(state);
        self.pointer = 0;
    }

    /// Rewrite every entry in place (used when a provisional id is
    /// replaced by the server's id).
    pub fn update_all(&mut self, mut f: impl FnMut(&mut T)) {
        self.entries.iter_mut().for_each(&mut f);
    }
}
