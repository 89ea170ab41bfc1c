//! This module constitutes the core, headless, and backend-agnostic query
//! engine of querly. It detects the term under the caret of a host-owned
//! editing surface, tracks a selectable index into an externally rendered
//! suggestion list, and turns raw surface events (content change, escape,
//! arrows, return, paste) into query-state transitions.

pub mod geometry;
pub mod query;
pub mod schedule;
pub mod surface;
pub mod term;
