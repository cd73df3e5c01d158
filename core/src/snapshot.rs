//! Snapshot encoding: one simulation entity to its plain serializable form.
//!
//! A snapshot is a value copy taken at one instant. It must outlive the
//! simulation object it describes, so it never borrows from it.
//!
//! Encoding is pure and order-preserving: the consumer builds chart
//! legends and route layers from the order it receives entities in.

use crate::{
    entity::{VisActor, VisLink, VisLocation},
    error::{VisError, VisResult},
    types::{ActorId, Occupancy},
};
use serde::{
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
    #[serde(rename = "lat")]
    pub latitude:   f64,
    #[serde(rename = "lng")]
    pub longitude:  f64,
    #[serde(rename = "pop")]
    pub population: u64,
    #[serde(rename = "refugees")]
    pub occupancy:  Occupancy,
    pub name:       String,
    #[serde(rename = "camp")]
    pub is_camp:    bool,
    /// Negative means unbounded.
    pub capacity:   i64,
}

/// One end of a link, referenced by name and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    pub name: String,
    pub lat:  f64,
    pub lng:  f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub from:      LinkEndpoint,
    pub to:        LinkEndpoint,
    pub distance:  f64,
    #[serde(rename = "refugees")]
    pub occupancy: Occupancy,
    pub forced:    bool,
}

/// An actor's exported state. `state` is always a JSON object whose
/// `"id"` field equals `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorSnapshot {
    pub id:    ActorId,
    pub state: Value,
}

pub fn encode_location<L: VisLocation + ?Sized>(location: &L) -> LocationSnapshot {
    LocationSnapshot {
        latitude:   location.latitude(),
        longitude:  location.longitude(),
        population: location.population(),
        occupancy:  location.occupancy(),
        name:       location.name().to_string(),
        is_camp:    location.is_camp(),
        capacity:   location.capacity(),
    }
}

/// Outgoing links of one location, in the location's own link order.
pub fn encode_links<L: VisLocation + ?Sized>(location: &L) -> Vec<LinkSnapshot> {
    let from = LinkEndpoint {
        name: location.name().to_string(),
        lat:  location.latitude(),
        lng:  location.longitude(),
    };
    location
        .links()
        .iter()
        .map(|link| LinkSnapshot {
            from:      from.clone(),
            to:        link.destination(),
            distance:  link.distance(),
            occupancy: link.occupancy(),
            forced:    link.forced(),
        })
        .collect()
}

/// Encode every location, and every location's links, in input order.
/// Links are grouped by their source location.
pub fn encode_locations_and_links<'a, L, I>(locations: I) -> (Vec<LocationSnapshot>, Vec<LinkSnapshot>)
where
    L: VisLocation + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let mut encoded_locations = Vec::new();
    let mut encoded_links = Vec::new();
    for location in locations {
        encoded_locations.push(encode_location(location));
        encoded_links.extend(encode_links(location));
    }
    (encoded_locations, encoded_links)
}

/// JSON has no encoding for NaN or infinity, so every coordinate and
/// distance must be finite before it is stored.
pub fn check_finite(locations: &[LocationSnapshot], links: &[LinkSnapshot]) -> VisResult<()> {
    for location in locations {
        finite(location.latitude, "lat", &location.name)?;
        finite(location.longitude, "lng", &location.name)?;
    }
    for link in links {
        let route = format!("{} -> {}", link.from.name, link.to.name);
        finite(link.distance, "distance", &route)?;
        finite(link.to.lat, "lat", &link.to.name)?;
        finite(link.to.lng, "lng", &link.to.name)?;
    }
    Ok(())
}

fn finite(value: f64, field: &str, owner: &str) -> VisResult<()> {
    if value.is_finite() {
        return Ok(());
    }
    Err(VisError::InvalidSnapshot { reason: format!("{owner}: {field} is {value}") })
}

/// Ask the actor for its visual state and tag it with the actor's id.
pub fn encode_actor<A: VisActor + ?Sized>(actor: &A) -> VisResult<ActorSnapshot> {
    let id = actor.actor_id();
    let state = actor
        .export_vis_state()
        .map_err(|e| VisError::ActorExport { id, reason: format!("{e:#}") })?;

    let mut fields = match state {
        Value::Object(fields) => fields,
        other => {
            return Err(VisError::ActorExport {
                id,
                reason: format!("exported state must be a JSON object, got {other}"),
            });
        }
    };

    match fields.get("id") {
        None => {
            fields.insert("id".into(), Value::from(id));
        }
        Some(existing) if existing.as_u64() == Some(id) => {}
        Some(existing) => {
            return Err(VisError::ActorExport {
                id,
                reason: format!("exported id {existing} does not match actor id"),
            });
        }
    }

    Ok(ActorSnapshot { id, state: Value::Object(fields) })
}

/// Actors recorded in one step, keyed by id, in first-recorded order.
///
/// Serialized as a JSON object: `{ "<id>": <state>, ... }`.
/// Recording an id that is already present replaces its state in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorCollection {
    entries:   Vec<ActorSnapshot>,
    positions: HashMap<ActorId, usize>,
}

impl ActorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Insert or replace. Returns true when an existing record was replaced.
    pub fn upsert(&mut self, snapshot: ActorSnapshot) -> bool {
        match self.positions.get(&snapshot.id) {
            Some(&pos) => {
                self.entries[pos] = snapshot;
                true
            }
            None => {
                self.positions.insert(snapshot.id, self.entries.len());
                self.entries.push(snapshot);
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    pub fn get(&self, id: ActorId) -> Option<&ActorSnapshot> {
        self.positions.get(&id).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.entries.iter().map(|a| a.id)
    }
}

impl FromIterator<ActorSnapshot> for ActorCollection {
    fn from_iter<T: IntoIterator<Item = ActorSnapshot>>(iter: T) -> Self {
        let mut out = Self::new();
        for snapshot in iter {
            out.upsert(snapshot);
        }
        out
    }
}

impl Serialize for ActorCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for actor in &self.entries {
            map.serialize_entry(&actor.id.to_string(), &actor.state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ActorCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ActorCollectionVisitor)
    }
}

/// Accepts the canonical id-keyed object, and the older list form where
/// each element carries its own `"id"`.
struct ActorCollectionVisitor;

impl<'de> Visitor<'de> for ActorCollectionVisitor {
    type Value = ActorCollection;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of actor id to actor state, or a list of actor states")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let mut out = ActorCollection::new();
        while let Some((key, state)) = map.next_entry::<String, Value>()? {
            let id: ActorId = key
                .parse()
                .map_err(|_| de::Error::custom(format!("actor key '{key}' is not a numeric id")))?;
            out.upsert(ActorSnapshot { id, state });
        }
        Ok(out)
    }

    fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
        let mut out = ActorCollection::new();
        while let Some(state) = seq.next_element::<Value>()? {
            let id = state
                .get("id")
                .and_then(Value::as_u64)
                .ok_or_else(|| de::Error::custom("listed actor has no numeric 'id' field"))?;
            out.upsert(ActorSnapshot { id, state });
        }
        Ok(out)
    }
}
