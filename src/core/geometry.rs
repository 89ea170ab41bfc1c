//! Caret geometry
//!
//! Screen-coordinate measurement of text positions. The state machine only
//! consumes the abstract [`CaretMeasure`] capability; it is never coupled
//! to a concrete selection/range API. A grid-based measurer is provided
//! for hosts that render on a fixed cell grid.

use unicode_width::UnicodeWidthStr;

// =============================================================================
// CARET RECT
// =============================================================================

/// Screen rectangle of a text position, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretRect {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

/// Geometry query over a text position
///
/// Implementations wrap whatever range/measurement API the host has
/// (browser-style cloned ranges, glyph layout, a cell grid). Coordinates
/// are only required to be valid after the surface has committed layout
/// for the most recent edit, which is why the state machine defers all
/// measurement to the host's next rendering opportunity.
pub trait CaretMeasure {
    /// Measure the screen rectangle of byte `offset` within `text`
    fn measure(&self, text: &str, offset: usize) -> CaretRect;
}

// =============================================================================
// GRID MEASURER
// =============================================================================

/// Cell-grid measurer for monospace hosts
///
/// Maps a byte offset to pixel coordinates from cell dimensions and the
/// grid's pixel origin. The column is the display width of the text before
/// the offset on its line, so wide characters occupy two cells.
#[derive(Debug, Clone, Copy)]
pub struct GridCaretMeasure {
    /// Width of a single cell in pixels
    pub cell_width: f32,
    /// Height of a single cell in pixels
    pub cell_height: f32,
    /// Horizontal offset of the grid origin from the left edge
    pub offset_x: f32,
    /// Vertical offset of the grid origin from the top edge
    pub offset_y: f32,
}

impl GridCaretMeasure {
    /// Create a measurer from cell dimensions and grid origin
    pub fn new(cell_width: f32, cell_height: f32, offset_x: f32, offset_y: f32) -> Self {
        Self {
            cell_width,
            cell_height,
            offset_x,
            offset_y,
        }
    }
}

impl CaretMeasure for GridCaretMeasure {
    fn measure(&self, text: &str, offset: usize) -> CaretRect {
        debug_assert!(offset <= text.len(), "measured offset past end of text");

        let before = &text[..offset.min(text.len())];
        let row = before.matches('\n').count();
        let line = match before.rfind('\n') {
            Some(i) => &before[i + 1..],
            None => before,
        };
        let col = UnicodeWidthStr::width(line);

        let left = self.offset_x + col as f32 * self.cell_width;
        let top = self.offset_y + row as f32 * self.cell_height;

        CaretRect {
            top,
            left,
            bottom: top + self.cell_height,
            right: left + self.cell_width,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
