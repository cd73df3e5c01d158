//! Shared fixtures: minimal entities that implement the recorder's
//! capability traits, plus in-memory and failing writers.

#![allow(dead_code)]

use simvis_core::{
    entity::{VisActor, VisLink, VisLocation},
    snapshot::LinkEndpoint,
    types::{ActorId, Occupancy},
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Place {
    pub name:       String,
    pub lat:        f64,
    pub lng:        f64,
    pub population: u64,
    pub occupancy:  Occupancy,
    pub camp:       bool,
    pub capacity:   i64,
    pub routes:     Vec<Route>,
}

pub struct Route {
    pub to:        LinkEndpoint,
    pub distance:  f64,
    pub occupancy: Occupancy,
    pub forced:    bool,
}

pub fn place(name: &str, occupancy: Occupancy) -> Place {
    Place {
        name: name.to_string(),
        lat: 16.5,
        lng: -2.25,
        population: 1_000,
        occupancy,
        camp: false,
        capacity: -1,
        routes: Vec::new(),
    }
}

pub fn route_to(dest: &Place, occupancy: Occupancy) -> Route {
    Route {
        to: LinkEndpoint { name: dest.name.clone(), lat: dest.lat, lng: dest.lng },
        distance: 120.5,
        occupancy,
        forced: false,
    }
}

impl VisLocation for Place {
    type Link = Route;

    fn latitude(&self) -> f64 { self.lat }
    fn longitude(&self) -> f64 { self.lng }
    fn population(&self) -> u64 { self.population }
    fn occupancy(&self) -> Occupancy { self.occupancy }
    fn name(&self) -> &str { &self.name }
    fn is_camp(&self) -> bool { self.camp }
    fn capacity(&self) -> i64 { self.capacity }
    fn links(&self) -> &[Route] { &self.routes }
}

impl VisLink for Route {
    fn destination(&self) -> LinkEndpoint { self.to.clone() }
    fn distance(&self) -> f64 { self.distance }
    fn occupancy(&self) -> Occupancy { self.occupancy }
    fn forced(&self) -> bool { self.forced }
}

pub struct Walker {
    pub id:   ActorId,
    pub note: String,
}

pub fn walker(id: ActorId, note: &str) -> Walker {
    Walker { id, note: note.to_string() }
}

impl VisActor for Walker {
    fn actor_id(&self) -> ActorId { self.id }

    fn export_vis_state(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({ "note": self.note }))
    }
}

/// An actor whose export always fails.
pub struct BrokenWalker {
    pub id: ActorId,
}

impl VisActor for BrokenWalker {
    fn actor_id(&self) -> ActorId { self.id }

    fn export_vis_state(&self) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("position unknown")
    }
}

/// Cloneable in-memory writer; clones share one buffer.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Accepts `limit` bytes, then fails every write.
pub struct FailingWriter {
    pub limit:   usize,
    pub written: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
