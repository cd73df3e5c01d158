//! Actor identifier allocation.
//!
//! Identifiers are handed out once, at actor creation, and never reused.
//! A single process-wide allocator backs the default path so ids stay
//! unique even when several recorders are alive at once. Tests and
//! embedding contexts may inject their own allocator instead.

use crate::types::ActorId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out monotonically increasing actor ids.
pub trait ActorIdAllocator: Send + Sync {
    fn next_id(&self) -> ActorId;
}

/// Lock-free counter. Safe to share between threads.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    pub const fn starting_at(first: ActorId) -> Self {
        Self { next: AtomicU64::new(first) }
    }

    /// The id the next call to `next_id` will return.
    pub fn peek(&self) -> ActorId {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self { Self::new() }
}

impl ActorIdAllocator for AtomicIdAllocator {
    fn next_id(&self) -> ActorId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

static GLOBAL_ACTOR_IDS: AtomicIdAllocator = AtomicIdAllocator::new();

/// The process-wide allocator. Starts at 0 when the process starts.
pub fn global_actor_ids() -> &'static AtomicIdAllocator {
    &GLOBAL_ACTOR_IDS
}
