//! Deferred-Read Scheduling
//!
//! Caret coordinates are only valid after the editing surface commits its
//! layout for an edit, so every content change schedules a geometry read
//! for the host's next rendering opportunity instead of reading inline.
//! Deferrals are single-shot and non-cancelable: if content changes again
//! before a pending read fires, both reads eventually fire. A generation
//! counter turns every stale read into a no-op, so only the most recently
//! scheduled read ever commits a result.

// =============================================================================
// SCHEDULED READ TOKEN
// =============================================================================

/// Token for one deferred caret/geometry read
///
/// Returned by [`ReadScheduler::schedule`]; the host hands it back on its
/// next paint/frame callback. Tokens are single-use by construction: each
/// carries the generation it was scheduled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRead {
    generation: u64,
}

impl ScheduledRead {
    /// The generation this read was scheduled under
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Generation counter for deferred reads
#[derive(Debug, Default)]
pub struct ReadScheduler {
    generation: u64,
}

impl ReadScheduler {
    /// Create a scheduler with no reads issued
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a fresh read, invalidating all previously issued tokens
    pub fn schedule(&mut self) -> ScheduledRead {
        self.generation += 1;
        ScheduledRead {
            generation: self.generation,
        }
    }

    /// Check whether a read token is still the latest scheduled one
    pub fn is_current(&self, read: &ScheduledRead) -> bool {
        read.generation == self.generation
    }
}

// =============================================================================
// TESTS
// =============================================================================
