//! Term Locator
//!
//! Pure functions over a text string and a caret offset. Given the text
//! content of the node containing the caret, find the open term ending
//! exactly at the caret: scan backward for the nearest boundary character
//! (per the host's [`BoundaryPolicy`]) and take everything after it.
//!
//! All offsets are byte offsets into the node text. Hosts feeding offsets
//! converted from other coordinate spaces (UTF-16 code units, grid columns)
//! should pass them through [`snap_to_grapheme`] first.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::BoundaryPolicy;

// =============================================================================
// TERM RANGE
// =============================================================================

/// The term under the caret
///
/// Ephemeral: computed fresh on every query, never cached. `end` is always
/// the caret offset: the term is the open span ending exactly at the caret,
/// never a token to the caret's right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRange {
    /// Byte offset of the first character of the term
    pub start: usize,
    /// Byte offset of the caret (exclusive end of the term)
    pub end: usize,
    /// The term text, `text_content[start..end]`; may be empty
    pub text: String,
}

impl TermRange {
    /// Length of the term in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the term is the empty string
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

// =============================================================================
// LOCATOR FUNCTIONS
// =============================================================================

/// Find the start of the term ending at `caret`, or `None` if no term is
/// active there.
///
/// Scans backward from the caret for the nearest character the policy
/// classifies as a boundary; the term starts just after it. Deterministic
/// and side-effect free: the same `(text, caret)` always yields the same
/// result.
///
/// Edge cases: empty `text` yields `None`; a caret at offset 0 of nonempty
/// text yields `Some(0)`: the empty term at the start of the node is an
/// active state, distinct from "no term".
pub fn term_start_index(text: &str, caret: usize, policy: &BoundaryPolicy) -> Option<usize> {
    debug_assert!(caret <= text.len(), "caret offset past end of node text");
    debug_assert!(
        text.is_char_boundary(caret),
        "caret offset splits a character"
    );

    if text.is_empty() {
        return None;
    }

    if caret == 0 {
        return Some(0);
    }

    for (i, c) in text[..caret].char_indices().rev() {
        if policy.is_boundary(c) {
            return Some(i + c.len_utf8());
        }
    }

    // No boundary before the caret: the term cannot be bounded
    None
}

/// Locate the full [`TermRange`] ending at `caret`, or `None` if no term
/// is active there.
pub fn locate_term(text: &str, caret: usize, policy: &BoundaryPolicy) -> Option<TermRange> {
    let start = term_start_index(text, caret, policy)?;
    debug_assert!(start <= caret, "term start past the caret");

    Some(TermRange {
        start,
        end: caret,
        text: text[start..caret].to_string(),
    })
}

/// Clamp a raw byte offset down to the nearest grapheme-cluster start.
///
/// Offsets at or past the end of the text clamp to `text.len()` (a valid
/// caret position). Offsets already on a cluster start pass through
/// unchanged.
pub fn snap_to_grapheme(text: &str, offset: usize) -> usize {
    if offset >= text.len() {
        return text.len();
    }

    let mut snapped = 0;
    for (i, _) in text.grapheme_indices(true) {
        if i > offset {
            break;
        }
        snapped = i;
    }
    snapped
}

/// Wrap an unclamped selected index into `[0, len)`.
///
/// The query state machine never clamps `selected_index`; hosts rendering a
/// bounded suggestion list use this to map it onto their list. Negative
/// indices wrap from the end. `len == 0` yields 0.
pub fn normalize_selected_index(index: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    // rem_euclid: -1 over a list of 4 selects 3
    match usize::try_from(index.rem_euclid(len as i64)) {
        Ok(v) => v,
        Err(_) => 0,
    }
}

// =============================================================================
// TESTS
// =============================================================================
