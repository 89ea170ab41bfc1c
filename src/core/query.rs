//! Query State Machine
//!
//! The stateful controller at the center of the crate. It owns at most one
//! [`QueryState`], consumes caret-change, escape, arrow, return, and paste
//! events from the host's editing surface, runs the term locator, measures
//! the popup anchor through the caret-measurement capability, and reports
//! every transition to the host through `on_query_change`.
//!
//! Two states: Idle (no active query) and Querying (one owned
//! `QueryState`). Idle is the initial state; there is no terminal state,
//! the machine resets to Idle repeatedly over its lifetime.

use log::trace;

use crate::config::BoundaryPolicy;
use crate::core::geometry::CaretMeasure;
use crate::core::schedule::{ReadScheduler, ScheduledRead};
use crate::core::surface::{Direction, EditSurface, EntitySpan, EventStatus};
use crate::core::term::{locate_term, snap_to_grapheme};

// =============================================================================
// QUERY STATE
// =============================================================================

/// The active query: term text, popup anchor, and selection index
///
/// Replaced wholesale on every content change; only `selected_index` is
/// ever mutated in place (by navigation, which does not touch geometry).
/// Hosts receive clones and cannot mutate the controller's copy.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    /// Anchor y for the suggestion popup (bottom edge of the term start)
    pub top: f32,
    /// Anchor x for the suggestion popup
    pub left: f32,
    /// The term text at the moment the state was (re)computed
    pub text: String,
    /// Selection index into the host's suggestion list; starts at 0,
    /// unclamped here (see `term::normalize_selected_index`)
    pub selected_index: i64,
}

// =============================================================================
// HOST CALLBACKS
// =============================================================================

/// Host configuration surface
///
/// Every field defaults to a no-op, so an unset callback never faults.
/// `on_query_change` is the single channel by which the host learns of
/// every query-state transition: creation, index change, and clearing.
pub struct Callbacks {
    /// Content-change passthrough, fired before the deferred read is
    /// scheduled
    pub on_change: Box<dyn FnMut()>,
    /// Escape passthrough, fired only when no query is active
    pub on_escape: Box<dyn FnMut()>,
    /// Up-arrow passthrough, fired only when no query is active
    pub on_up_arrow: Box<dyn FnMut()>,
    /// Down-arrow passthrough, fired only when no query is active
    pub on_down_arrow: Box<dyn FnMut()>,
    /// Receives a snapshot of the query state (or `None`) on every
    /// transition
    pub on_query_change: Box<dyn FnMut(Option<QueryState>)>,
    /// Return passthrough when no query is active; its status decides
    /// whether the surface's default (newline insertion) runs
    pub handle_return: Box<dyn FnMut() -> EventStatus>,
    /// Term commit: `(term_text, selected_index, span_to_replace)`
    pub handle_query_return: Box<dyn FnMut(&str, i64, EntitySpan)>,
    /// Paste passthrough; insertion itself stays with the surface
    pub handle_pasted_text: Box<dyn FnMut(&str)>,
}

impl Default for Callbacks {
    fn default() -> Self {
        Self {
            on_change: Box::new(|| {}),
            on_escape: Box::new(|| {}),
            on_up_arrow: Box::new(|| {}),
            on_down_arrow: Box::new(|| {}),
            on_query_change: Box::new(|_| {}),
            handle_return: Box::new(|| EventStatus::NotHandled),
            handle_query_return: Box::new(|_, _, _| {}),
            handle_pasted_text: Box::new(|_| {}),
        }
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// The query state machine
///
/// Single-threaded and event-driven: all transitions happen on the host's
/// event/callback queue. The only suspension point is the deferred
/// geometry read, which yields to the host's rendering cycle and resumes
/// through [`QueryController::complete_scheduled_read`].
pub struct QueryController {
    state: Option<QueryState>,
    scheduler: ReadScheduler,
    policy: BoundaryPolicy,
    callbacks: Callbacks,
}

impl QueryController {
    /// Create a controller with the given boundary policy and callbacks
    pub fn new(policy: BoundaryPolicy, callbacks: Callbacks) -> Self {
        Self {
            state: None,
            scheduler: ReadScheduler::new(),
            policy,
            callbacks,
        }
    }

    /// Read-only view of the current query state
    pub fn query_state(&self) -> Option<&QueryState> {
        self.state.as_ref()
    }

    /// Check whether a query is active
    pub fn is_querying(&self) -> bool {
        self.state.is_some()
    }

    /// Give input focus to the editing surface
    pub fn focus(&self, surface: &mut dyn EditSurface) {
        surface.request_focus();
    }

    /// Handle a content change on the surface.
    ///
    /// Fires the `on_change` passthrough, then schedules a caret/geometry
    /// read for the host's next rendering opportunity (coordinates are
    /// only valid after layout settles). The host must hand the returned
    /// token back via [`complete_scheduled_read`] on its next paint
    /// callback, so `on_query_change` is always asynchronous relative to
    /// the triggering keystroke.
    ///
    /// [`complete_scheduled_read`]: QueryController::complete_scheduled_read
    pub fn on_content_changed(&mut self) -> ScheduledRead {
        (self.callbacks.on_change)();
        self.scheduler.schedule()
    }

    /// Run a previously scheduled caret read.
    ///
    /// Stale tokens (superseded by a later content change) are discarded
    /// without touching state or notifying: only the most recently
    /// scheduled read commits a result. A current token replaces the query
    /// state wholesale (or clears it when no selection exists or the
    /// locator returns the sentinel) and notifies the host either way.
    pub fn complete_scheduled_read(
        &mut self,
        read: ScheduledRead,
        surface: &dyn EditSurface,
        caret: &dyn CaretMeasure,
    ) {
        if !self.scheduler.is_current(&read) {
            trace!(
                "discarding stale caret read (generation {})",
                read.generation()
            );
            return;
        }

        self.state = self.read_query_state(surface, caret);
        trace!(
            "content change resolved: {}",
            if self.state.is_some() {
                "querying"
            } else {
                "idle"
            }
        );
        self.notify_query_change();
    }

    /// Compute a fresh query state from the surface's current caret
    fn read_query_state(
        &self,
        surface: &dyn EditSurface,
        caret: &dyn CaretMeasure,
    ) -> Option<QueryState> {
        // No usable selection is the normal "no query" result
        let selection = surface.current_selection()?;
        let offset = snap_to_grapheme(&selection.text, selection.offset);
        let range = locate_term(&selection.text, offset, &self.policy)?;

        // Anchor on the position before the term, not the caret itself;
        // the popup hangs below it
        let rect = caret.measure(&selection.text, range.start);

        Some(QueryState {
            top: rect.bottom,
            left: rect.left,
            text: range.text,
            selected_index: 0,
        })
    }

    /// Handle an escape key from the surface.
    ///
    /// Idle: delegates to the host's own escape handler and lets the
    /// surface's default run. Querying: clears exactly the query level
    /// (the host handler is not invoked) and suppresses the default.
    pub fn on_escape(&mut self) -> EventStatus {
        if self.state.is_none() {
            (self.callbacks.on_escape)();
            return EventStatus::NotHandled;
        }

        trace!("escape: clearing query state");
        self.state = None;
        self.notify_query_change();
        EventStatus::Handled
    }

    /// Handle an up/down arrow from the surface.
    ///
    /// Idle: delegates to the host's arrow handler so default caret
    /// movement still occurs. Querying: steps `selected_index` in place
    /// (no clamping) and suppresses default caret movement; geometry and
    /// term text are not recomputed.
    pub fn on_arrow(&mut self, direction: Direction) -> EventStatus {
        if self.state.is_none() {
            match direction {
                Direction::Up => (self.callbacks.on_up_arrow)(),
                Direction::Down => (self.callbacks.on_down_arrow)(),
            }
            return EventStatus::Handled;
        }

        if let Some(ref mut state) = self.state {
            state.selected_index += direction.step();
        }
        self.notify_query_change();
        EventStatus::Handled
    }

    /// Handle a return key from the surface.
    ///
    /// Idle: the `handle_return` passthrough decides (default no-op
    /// reports not-handled, so the surface inserts its newline). Querying:
    /// derives the span covering the term text ending at the current
    /// focus, hands `(text, selected_index, span)` to
    /// `handle_query_return`, then clears the query state.
    pub fn on_commit(&mut self, surface: &dyn EditSurface) -> EventStatus {
        let Some(state) = self.state.take() else {
            return (self.callbacks.handle_return)();
        };

        let focus = surface.focus_offset();
        debug_assert!(
            state.text.len() <= focus,
            "term text longer than the focus offset"
        );
        let anchor = focus.saturating_sub(state.text.len());
        let span = EntitySpan::new(anchor, focus);

        trace!(
            "commit: term {:?} index {} span {}..{}",
            state.text,
            state.selected_index,
            span.start(),
            span.end()
        );
        (self.callbacks.handle_query_return)(&state.text, state.selected_index, span);

        self.notify_query_change();
        EventStatus::Handled
    }

    /// Handle pasted content.
    ///
    /// Acceptance is unconditional and no transformation is applied; the
    /// surface's default paste behavior performs the insertion.
    pub fn on_paste(&mut self, fragment: &str) -> EventStatus {
        (self.callbacks.handle_pasted_text)(fragment);
        EventStatus::Handled
    }

    /// Notify the host with an immutable snapshot of the current state
    fn notify_query_change(&mut self) {
        let snapshot = self.state.clone();
        (self.callbacks.on_query_change)(snapshot);
    }
}

impl Default for QueryController {
    fn default() -> Self {
        Self::new(BoundaryPolicy::default(), Callbacks::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::geometry::CaretRect;
    use crate::core::surface::SelectionSnapshot;

    struct ScriptedSurface {
        selection: Option<SelectionSnapshot>,
        focused: bool,
    }

    impl ScriptedSurface {
        fn with_caret(text: &str, offset: usize) -> Self {
            Self {
                selection: Some(SelectionSnapshot {
                    text: text.to_string(),
                    offset,
                }),
                focused: false,
            }
        }

        fn without_selection() -> Self {
            Self {
                selection: None,
                focused: false,
            }
        }
    }

    impl EditSurface for ScriptedSurface {
        fn current_selection(&self) -> Option<SelectionSnapshot> {
            self.selection.clone()
        }

        fn focus_offset(&self) -> usize {
            match &self.selection {
                Some(s) => s.offset,
                None => 0,
            }
        }

        fn request_focus(&mut self) {
            self.focused = true;
        }
    }

    struct FixedMeasure(CaretRect);

    impl CaretMeasure for FixedMeasure {
        fn measure(&self, _text: &str, _offset: usize) -> CaretRect {
            self.0
        }
    }

    fn measure_at(top: f32, left: f32) -> FixedMeasure {
        FixedMeasure(CaretRect {
            top,
            left,
            bottom: top + 16.0,
            right: left + 8.0,
        })
    }

    fn notified_states() -> (Rc<RefCell<Vec<Option<QueryState>>>>, Callbacks) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let callbacks = Callbacks {
            on_query_change: Box::new(move |s| sink.borrow_mut().push(s)),
            ..Callbacks::default()
        };
        (log, callbacks)
    }

    fn drive_content_change(
        controller: &mut QueryController,
        surface: &ScriptedSurface,
        caret: &dyn CaretMeasure,
    ) {
        let read = controller.on_content_changed();
        controller.complete_scheduled_read(read, surface, caret);
    }

    #[test]
    fn test_idle_to_querying() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);
        let surface = ScriptedSurface::with_caret("hello @wor", 10);

        drive_content_change(&mut controller, &surface, &measure_at(10.0, 20.0));

        assert!(controller.is_querying());
        let notified = log.borrow();
        assert_eq!(notified.len(), 1);
        let state = notified[0].as_ref().unwrap();
        assert_eq!(state.text, "wor");
        assert_eq!(state.selected_index, 0);
        // Popup hangs below the rect: top is the measured bottom edge
        assert_eq!(state.top, 26.0);
        assert_eq!(state.left, 20.0);
    }

    #[test]
    fn test_boundary_loss_clears_state() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);
        let caret = measure_at(0.0, 0.0);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hello @wor", 10),
            &caret,
        );
        assert!(controller.is_querying());

        // Caret moved into unrelated text with no boundary
        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("plain words", 5),
            &caret,
        );

        assert!(!controller.is_querying());
        assert_eq!(log.borrow().last(), Some(&None));
    }

    #[test]
    fn test_no_selection_is_no_query() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::default(), callbacks);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::without_selection(),
            &measure_at(0.0, 0.0),
        );

        assert!(!controller.is_querying());
        assert_eq!(log.borrow().last(), Some(&None));
    }

    #[test]
    fn test_replacement_is_wholesale() {
        let (_, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);
        let caret = measure_at(0.0, 0.0);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hi @ab", 6),
            &caret,
        );
        assert_eq!(controller.on_arrow(Direction::Down), EventStatus::Handled);
        assert_eq!(controller.query_state().unwrap().selected_index, 1);

        // Next content change resets the index along with everything else
        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hi @abc", 7),
            &caret,
        );
        let state = controller.query_state().unwrap();
        assert_eq!(state.text, "abc");
        assert_eq!(state.selected_index, 0);
    }

    #[test]
    fn test_navigation_mutates_index_only() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hello @wor", 10),
            &measure_at(10.0, 20.0),
        );
        let before = controller.query_state().unwrap().clone();

        assert_eq!(controller.on_arrow(Direction::Down), EventStatus::Handled);
        assert_eq!(controller.on_arrow(Direction::Down), EventStatus::Handled);

        let after = controller.query_state().unwrap();
        assert_eq!(after.selected_index, 2);
        assert_eq!(after.top, before.top);
        assert_eq!(after.left, before.left);
        assert_eq!(after.text, before.text);

        // Each navigation notified with the mutated snapshot
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_navigation_is_unclamped() {
        let (_, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("@x", 2),
            &measure_at(0.0, 0.0),
        );

        controller.on_arrow(Direction::Up);
        controller.on_arrow(Direction::Up);
        assert_eq!(controller.query_state().unwrap().selected_index, -2);
    }

    #[test]
    fn test_idle_arrows_delegate() {
        let ups = Rc::new(RefCell::new(0));
        let downs = Rc::new(RefCell::new(0));
        let up_sink = Rc::clone(&ups);
        let down_sink = Rc::clone(&downs);
        let callbacks = Callbacks {
            on_up_arrow: Box::new(move || *up_sink.borrow_mut() += 1),
            on_down_arrow: Box::new(move || *down_sink.borrow_mut() += 1),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::default(), callbacks);

        assert_eq!(controller.on_arrow(Direction::Up), EventStatus::Handled);
        assert_eq!(controller.on_arrow(Direction::Down), EventStatus::Handled);
        assert_eq!(*ups.borrow(), 1);
        assert_eq!(*downs.borrow(), 1);
    }

    #[test]
    fn test_commit_derives_span() {
        let committed = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&committed);
        let callbacks = Callbacks {
            handle_query_return: Box::new(move |text, index, span| {
                *sink.borrow_mut() = Some((text.to_string(), index, span));
            }),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);
        let surface = ScriptedSurface::with_caret("hello @wor", 10);

        drive_content_change(&mut controller, &surface, &measure_at(0.0, 0.0));
        controller.on_arrow(Direction::Down);

        assert_eq!(controller.on_commit(&surface), EventStatus::Handled);
        let committed = committed.borrow();
        let (text, index, span) = committed.as_ref().unwrap();
        assert_eq!(text, "wor");
        assert_eq!(*index, 1);
        assert_eq!(span.start(), 7);
        assert_eq!(span.end(), 10);

        // Commit consumes the state
        assert!(!controller.is_querying());
    }

    #[test]
    fn test_idle_commit_passes_through() {
        let returns = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&returns);
        let callbacks = Callbacks {
            handle_return: Box::new(move || {
                *sink.borrow_mut() += 1;
                EventStatus::NotHandled
            }),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::default(), callbacks);
        let surface = ScriptedSurface::with_caret("hello", 5);

        assert_eq!(controller.on_commit(&surface), EventStatus::NotHandled);
        assert_eq!(*returns.borrow(), 1);
    }

    #[test]
    fn test_escape_clears_one_level() {
        let escapes = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&escapes);
        let callbacks = Callbacks {
            on_escape: Box::new(move || *sink.borrow_mut() += 1),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hi @a", 5),
            &measure_at(0.0, 0.0),
        );

        // Querying: the query level clears, the host handler stays silent
        assert_eq!(controller.on_escape(), EventStatus::Handled);
        assert!(!controller.is_querying());
        assert_eq!(*escapes.borrow(), 0);

        // Idle: the host handler runs and the default applies
        assert_eq!(controller.on_escape(), EventStatus::NotHandled);
        assert_eq!(*escapes.borrow(), 1);
    }

    #[test]
    fn test_paste_always_handled() {
        let pasted = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&pasted);
        let callbacks = Callbacks {
            handle_pasted_text: Box::new(move |s| sink.borrow_mut().push(s.to_string())),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::default(), callbacks);

        assert_eq!(controller.on_paste("anything"), EventStatus::Handled);
        assert_eq!(controller.on_paste(""), EventStatus::Handled);
        assert_eq!(pasted.borrow().as_slice(), ["anything", ""]);
    }

    #[test]
    fn test_stale_read_is_discarded() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);
        let caret = measure_at(0.0, 0.0);

        let first = controller.on_content_changed();
        let second = controller.on_content_changed();

        // The older read fires late, after the newer one already resolved
        controller.complete_scheduled_read(
            second,
            &ScriptedSurface::with_caret("new @term", 9),
            &caret,
        );
        controller.complete_scheduled_read(
            first,
            &ScriptedSurface::with_caret("old text", 8),
            &caret,
        );

        // The stale read neither mutated state nor notified
        assert_eq!(controller.query_state().unwrap().text, "term");
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_content_change_fires_passthrough() {
        let changes = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&changes);
        let callbacks = Callbacks {
            on_change: Box::new(move || *sink.borrow_mut() += 1),
            ..Callbacks::default()
        };
        let mut controller = QueryController::new(BoundaryPolicy::default(), callbacks);

        let _ = controller.on_content_changed();
        let _ = controller.on_content_changed();
        assert_eq!(*changes.borrow(), 2);
    }

    #[test]
    fn test_focus_passthrough() {
        let controller = QueryController::default();
        let mut surface = ScriptedSurface::with_caret("x", 1);
        controller.focus(&mut surface);
        assert!(surface.focused);
    }

    #[test]
    fn test_empty_term_at_offset_zero_is_active() {
        let (log, callbacks) = notified_states();
        let mut controller = QueryController::new(BoundaryPolicy::Trigger('@'), callbacks);

        drive_content_change(
            &mut controller,
            &ScriptedSurface::with_caret("hello", 0),
            &measure_at(0.0, 0.0),
        );

        let notified = log.borrow();
        let state = notified[0].as_ref().unwrap();
        assert_eq!(state.text, "");
        assert_eq!(state.selected_index, 0);
    }
}
