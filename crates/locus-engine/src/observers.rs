//! Per-request subscriber registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle returned by [`Observers::add`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Raw identifier value.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered collection of callbacks keyed by a wrapping 64-bit counter.
///
/// Iteration order is insertion order. Identifiers start at 1 and wrap to 0
/// after `u64::MAX`.
#[derive(Debug)]
pub struct Observers<C> {
    next_id: u64,
    entries: Vec<(ObserverId, C)>,
}

impl<C> Default for Observers<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<C: Clone> Observers<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback.
    pub fn add(&mut self, callback: C) -> ObserverId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = ObserverId(self.next_id);
        self.entries.push((id, callback));
        id
    }

    /// Unregister a callback, returning it if it was present.
    pub fn remove(&mut self, id: ObserverId) -> Option<C> {
        let index = self.entries.iter().position(|(entry, _)| *entry == id)?;
        Some(self.entries.remove(index).1)
    }

    /// Unregister every callback.
    pub fn remove_all(&mut self) {
        self.entries.clear();
    }

    /// Snapshot of the registered callbacks in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<C> {
        self.entries.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
