//! A small deterministic world for exercising the recorder end to end.
//!
//! Travellers appear at the conflict town every day, walk the road
//! network one link per day, and stop once they reach a camp. A camp at
//! capacity turns travellers away onto another road, and that road is
//! marked as forced for the day.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use simvis_core::{
    entity::{VisActor, VisLink, VisLocation},
    ids::ActorIdAllocator,
    snapshot::LinkEndpoint,
    types::{ActorId, Occupancy},
};

/// Chance that a traveller outside a camp sets off on a given day.
const MOVE_CHANCE: f64 = 0.6;

pub struct Town {
    name:       String,
    lat:        f64,
    lng:        f64,
    population: u64,
    camp:       bool,
    capacity:   i64,
    occupancy:  Occupancy,
    roads:      Vec<Road>,
}

pub struct Road {
    to:        usize,
    endpoint:  LinkEndpoint,
    distance:  f64,
    occupancy: Occupancy,
    forced:    bool,
}

pub struct Traveller {
    id:         ActorId,
    born_day:   u64,
    at:         usize,
    /// `(town, road)` while walking a link.
    on_road:    Option<(usize, usize)>,
    place_name: String,
    moves:      u32,
}

pub struct DemoWorld {
    towns:      Vec<Town>,
    travellers: Vec<Traveller>,
    rng:        Pcg64Mcg,
    day:        u64,
}

impl DemoWorld {
    pub fn new(seed: u64) -> Self {
        let mut towns = vec![
            town("Kidal", 18.44, 1.41, 25_617, false, -1),
            town("Gao", 16.27, -0.04, 86_633, false, -1),
            town("Timbuktu", 16.77, -3.01, 54_453, false, -1),
            town("Mopti", 14.49, -4.20, 114_296, false, -1),
            town("Mbera", 15.80, -5.78, 0, true, 400),
            town("Abala", 14.93, 3.43, 0, true, 250),
        ];
        let roads: [(usize, usize, f64); 6] = [
            (0, 1, 341.0),
            (1, 2, 420.0),
            (2, 3, 327.0),
            (2, 4, 296.0),
            (3, 4, 402.0),
            (1, 5, 388.0),
        ];
        for (a, b, distance) in roads {
            connect(&mut towns, a, b, distance);
            connect(&mut towns, b, a, distance);
        }
        Self {
            towns,
            travellers: Vec::new(),
            rng: Pcg64Mcg::seed_from_u64(seed),
            day: 0,
        }
    }

    pub fn towns(&self) -> &[Town] { &self.towns }
    pub fn travellers(&self) -> &[Traveller] { &self.travellers }
    pub fn day(&self) -> u64 { self.day }

    /// Add up to `max_new` travellers at the conflict town.
    pub fn spawn(&mut self, max_new: u64, ids: &dyn ActorIdAllocator) {
        let count = if max_new == 0 { 0 } else { self.rng.gen_range(0..=max_new) };
        for _ in 0..count {
            self.travellers.push(Traveller {
                id:         ids.next_id(),
                born_day:   self.day,
                at:         0,
                on_road:    None,
                place_name: self.towns[0].name.clone(),
                moves:      0,
            });
        }
    }

    /// Advance one day.
    pub fn evolve(&mut self) {
        for town in &mut self.towns {
            for road in &mut town.roads {
                road.forced = false;
            }
        }
        self.recount();

        for i in 0..self.travellers.len() {
            if let Some((from, road)) = self.travellers[i].on_road.take() {
                let to = self.towns[from].roads[road].to;
                let traveller = &mut self.travellers[i];
                traveller.at = to;
                traveller.place_name = self.towns[to].name.clone();
                continue;
            }

            let at = self.travellers[i].at;
            if self.towns[at].camp || !self.rng.gen_bool(MOVE_CHANCE) {
                continue;
            }
            let roads = self.towns[at].roads.len();
            if roads == 0 {
                continue;
            }
            let mut choice = self.rng.gen_range(0..roads);
            let dest = &self.towns[self.towns[at].roads[choice].to];
            if dest.camp && dest.capacity >= 0 && dest.occupancy >= dest.capacity as u64 {
                choice = (choice + 1) % roads;
                self.towns[at].roads[choice].forced = true;
            }
            let traveller = &mut self.travellers[i];
            traveller.on_road = Some((at, choice));
            traveller.place_name = format!("{} (road)", self.towns[at].name);
            traveller.moves += 1;
        }

        self.recount();
        self.day += 1;
    }

    fn recount(&mut self) {
        for town in &mut self.towns {
            town.occupancy = 0;
            for road in &mut town.roads {
                road.occupancy = 0;
            }
        }
        for traveller in &self.travellers {
            match traveller.on_road {
                Some((from, road)) => self.towns[from].roads[road].occupancy += 1,
                None => self.towns[traveller.at].occupancy += 1,
            }
        }
    }
}

fn town(name: &str, lat: f64, lng: f64, population: u64, camp: bool, capacity: i64) -> Town {
    Town {
        name: name.to_string(),
        lat,
        lng,
        population,
        camp,
        capacity,
        occupancy: 0,
        roads: Vec::new(),
    }
}

fn connect(towns: &mut [Town], from: usize, to: usize, distance: f64) {
    let endpoint = LinkEndpoint {
        name: towns[to].name.clone(),
        lat:  towns[to].lat,
        lng:  towns[to].lng,
    };
    towns[from].roads.push(Road {
        to,
        endpoint,
        distance,
        occupancy: 0,
        forced: false,
    });
}

impl VisLocation for Town {
    type Link = Road;

    fn latitude(&self) -> f64 { self.lat }
    fn longitude(&self) -> f64 { self.lng }
    fn population(&self) -> u64 { self.population }
    fn occupancy(&self) -> Occupancy { self.occupancy }
    fn name(&self) -> &str { &self.name }
    fn is_camp(&self) -> bool { self.camp }
    fn capacity(&self) -> i64 { self.capacity }
    fn links(&self) -> &[Road] { &self.roads }
}

impl VisLink for Road {
    fn destination(&self) -> LinkEndpoint { self.endpoint.clone() }
    fn distance(&self) -> f64 { self.distance }
    fn occupancy(&self) -> Occupancy { self.occupancy }
    fn forced(&self) -> bool { self.forced }
}

impl VisActor for Traveller {
    fn actor_id(&self) -> ActorId { self.id }

    fn export_vis_state(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "location":  self.place_name,
            "travelling": self.on_road.is_some(),
            "born_day":  self.born_day,
            "moves":     self.moves,
        }))
    }
}
