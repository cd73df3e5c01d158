//! Shared primitive types used across the recorder.

/// Position of a step in the timeline. One step = one simulated time unit.
pub type StepIndex = usize;

/// A stable, process-unique actor identifier.
pub type ActorId = u64;

/// Occupancy count (actors at a location or on a link).
pub type Occupancy = u64;

/// Sentinel for a running maximum that has not seen any data yet.
/// Consumers must read a negative maximum as "unknown".
pub const NO_DATA: i64 = -1;
