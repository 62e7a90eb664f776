//! # Dirty Queue
//!
//! Entities whose component set changed since their last reconciliation.
//!
//! ## Double Buffering
//!
//! ```text
//! Drain N:
//!   container swaps the pending buffer with its (empty) batch buffer
//!   container reconciles the batch
//!   hooks dirtying entities push into the pending buffer
//!
//! Drain N+1:
//!   SWAP again, the entities dirtied during drain N are processed now
//! ```
//!
//! The buffer being iterated is never the one being appended to, and both
//! allocations are reused from drain to drain.

use std::sync::Arc;

use parking_lot::Mutex;

use super::entity::EntityId;

/// Handle shared by a container and its attached entities.
pub(crate) type SharedDirtyQueue = Arc<Mutex<DirtyQueue>>;

/// Pending set of dirty entities, in the order they were dirtied.
#[derive(Debug, Default)]
pub struct DirtyQueue {
    pending: Vec<EntityId>,
}

impl DirtyQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared() -> SharedDirtyQueue {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Number of pending entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns `true` if `id` is pending.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.pending.contains(&id)
    }

    /// Pending entities in dirtying order.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[EntityId] {
        &self.pending
    }

    /// Appends an entity. Callers guard against duplicates with the
    /// entity's dirty flag.
    pub(crate) fn push(&mut self, id: EntityId) {
        debug_assert!(!self.pending.contains(&id), "entity {id} queued twice");
        self.pending.push(id);
    }

    /// Drops a pending entity. Returns `true` if it was queued.
    pub(crate) fn purge(&mut self, id: EntityId) -> bool {
        if let Some(index) = self.pending.iter().position(|&pending| pending == id) {
            self.pending.remove(index);
            true
        } else {
            false
        }
    }

    /// Swaps the pending buffer into `batch`. `batch` must be empty and is
    /// left holding every pending entity; the queue keeps `batch`'s old
    /// allocation for the next drain.
    pub(crate) fn swap_into(&mut self, batch: &mut Vec<EntityId>) {
        debug_assert!(batch.is_empty(), "previous batch was not consumed");
        std::mem::swap(&mut self.pending, batch);
    }
}
