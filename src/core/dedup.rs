//! Duplicate-work guard for the backlog.
//!
//! The guard is not synchronized on its own; it lives inside the backlog so
//! that checking a fingerprint and enqueueing the job happen under one lock.

use std::collections::HashSet;

use crate::core::job::Fingerprint;

/// Set of fingerprints that currently count as pending work.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    pending: HashSet<Fingerprint>,
}

impl DuplicateGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the fingerprint is already marked.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.pending.contains(fingerprint)
    }

    /// Mark a fingerprint. Returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.pending.insert(fingerprint)
    }

    /// Clear a fingerprint. Returns `false` if it was not present.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> bool {
        self.pending.remove(fingerprint)
    }

    /// Number of marked fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
