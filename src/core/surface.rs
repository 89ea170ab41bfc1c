//! Editing Surface Boundary
//!
//! Contracts between the query engine and the host's editing surface.
//! The surface owns text, selection, and rendering; this crate only reads
//! from it and reports back whether each event was handled (handled also
//! means "suppress the surface's default behavior for this event").

use std::cmp::{max, min};

// =============================================================================
// EVENT SIGNALS
// =============================================================================

/// Signal returned to the surface for every routed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    /// The event was consumed; the surface must suppress its default
    Handled,
    /// The event was not consumed; the surface's default applies
    NotHandled,
}

impl EventStatus {
    /// Check if this status consumed the event
    pub fn is_handled(&self) -> bool {
        matches!(self, EventStatus::Handled)
    }
}

/// Direction of a suggestion-list navigation event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The index step this direction applies (-1 up, +1 down)
    pub fn step(&self) -> i64 {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
        }
    }
}

// =============================================================================
// SURFACE QUERY INTERFACE
// =============================================================================

/// A read of the surface's current caret context
///
/// `text` is the full text content of the node containing the caret,
/// `offset` the caret's byte offset within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub text: String,
    pub offset: usize,
}

/// Query interface over the host's editing surface
///
/// An empty selection set is a normal "no query" condition, not an error,
/// so `current_selection` returns `Option` rather than `Result`.
pub trait EditSurface {
    /// Read the node text and caret offset of the current selection, if any
    fn current_selection(&self) -> Option<SelectionSnapshot>;

    /// Byte offset of the selection focus (caret) within its node
    fn focus_offset(&self) -> usize;

    /// Give input focus to the editing surface
    fn request_focus(&mut self);
}

// =============================================================================
// ENTITY SPAN
// =============================================================================

/// The selection span derived on commit: the term text ending at the
/// current focus, `[focus - term_len, focus)`. The host replaces this span
/// with the chosen entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntitySpan {
    /// Anchor position (start of the term)
    pub anchor: usize,
    /// Cursor position (the focus the term ends at)
    pub cursor: usize,
}

impl EntitySpan {
    /// Create a span from anchor to cursor
    pub fn new(anchor: usize, cursor: usize) -> Self {
        Self { anchor, cursor }
    }

    /// Get the start of the span (smaller position)
    pub fn start(&self) -> usize {
        min(self.anchor, self.cursor)
    }

    /// Get the end of the span (larger position)
    pub fn end(&self) -> usize {
        max(self.anchor, self.cursor)
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if this is an empty span
    pub fn is_empty(&self) -> bool {
        self.anchor == self.cursor
    }
}

// =============================================================================
// TESTS
// =============================================================================
