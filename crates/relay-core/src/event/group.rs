use std::fmt;

use crate::dispatch::Destination;

/// How trigger names are matched against registered group names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Only the group whose name equals the trigger name fires.
    #[default]
    Exact,
    /// When no group has the exact name, every registered name is treated as
    /// an anchored regular expression and matched against the trigger name.
    Pattern,
}

/// Callbacks and firing policy of one event group.
pub struct EventGroup<A> {
    callbacks: Vec<Destination<A>>,
    remove: bool,
    reset: bool,
}

impl<A> EventGroup<A> {
    pub(crate) const fn new(remove: bool, reset: bool) -> Self {
        Self {
            callbacks: Vec::new(),
            remove,
            reset,
        }
    }

    pub(crate) fn push(&mut self, destination: Destination<A>) {
        self.callbacks.push(destination);
    }

    /// Callbacks in attach order.
    #[must_use]
    pub fn callbacks(&self) -> &[Destination<A>] {
        &self.callbacks
    }

    /// Whether the group is deleted after it fires.
    #[must_use]
    pub const fn remove(&self) -> bool {
        self.remove
    }

    /// Whether sub-requirements are re-armed after the group fires.
    #[must_use]
    pub const fn reset(&self) -> bool {
        self.reset
    }
}

impl<A> fmt::Debug for EventGroup<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("EventGroup")
            .field("callbacks", &self.callbacks)
            .field("remove", &self.remove)
            .field("reset", &self.reset)
            .finish()
    }
}
