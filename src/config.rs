// Configuration module
// Boundary policy: which characters bound the term under the caret

/// Policy deciding which characters act as term boundaries.
///
/// The term locator scans backward from the caret and stops at the first
/// character the policy classifies as a boundary; the term starts just
/// after it. The exact rule is host-configurable rather than fixed.
#[derive(Debug, Clone)]
pub enum BoundaryPolicy {
    /// A single trigger character starts a term (e.g. `@` for mentions)
    Trigger(char),
    /// Any of a set of trigger characters starts a term
    AnyOf(Vec<char>),
    /// Any whitespace character bounds a term
    Whitespace,
    /// Arbitrary predicate over a character
    Custom(fn(char) -> bool),
}

impl BoundaryPolicy {
    /// Check whether `c` bounds a term under this policy
    pub fn is_boundary(&self, c: char) -> bool {
        match self {
            BoundaryPolicy::Trigger(t) => c == *t,
            BoundaryPolicy::AnyOf(set) => set.contains(&c),
            BoundaryPolicy::Whitespace => c.is_whitespace(),
            BoundaryPolicy::Custom(pred) => pred(c),
        }
    }
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        BoundaryPolicy::Trigger('@')
    }
}

impl From<char> for BoundaryPolicy {
    fn from(c: char) -> Self {
        BoundaryPolicy::Trigger(c)
    }
}

impl From<Vec<char>> for BoundaryPolicy {
    fn from(set: Vec<char>) -> Self {
        BoundaryPolicy::AnyOf(set)
    }
}
