//! Capabilities a simulation's entities expose to the recorder.
//!
//! RULE: The recorder only reads through these traits.
//! It never owns simulation objects and never assumes their layout
//! beyond what is declared here.

use crate::{
    snapshot::LinkEndpoint,
    types::{ActorId, Occupancy},
};

/// A place on the map: town, conflict zone or camp.
pub trait VisLocation {
    type Link: VisLink;

    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
    /// Resident (non-actor) population.
    fn population(&self) -> u64;
    /// Actors currently at this location.
    fn occupancy(&self) -> Occupancy;
    fn name(&self) -> &str;
    fn is_camp(&self) -> bool;
    /// Negative means unbounded.
    fn capacity(&self) -> i64;
    /// Outgoing links, in the order the consumer should see them.
    fn links(&self) -> &[Self::Link];
}

/// A directed edge leaving a location.
pub trait VisLink {
    fn destination(&self) -> LinkEndpoint;
    fn distance(&self) -> f64;
    /// Actors currently travelling along this link.
    fn occupancy(&self) -> Occupancy;
    /// True when travel on this link was forced by a closure redirect.
    fn forced(&self) -> bool;
}

/// A mobile actor that can describe itself for visualization.
pub trait VisActor {
    /// Identifier assigned once at creation. See [`crate::ids`].
    fn actor_id(&self) -> ActorId;

    /// Export the actor's visual state as a JSON object.
    /// The recorder does not interpret anything but the `"id"` field.
    fn export_vis_state(&self) -> anyhow::Result<serde_json::Value>;
}
