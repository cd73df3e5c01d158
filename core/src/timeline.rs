//! The timeline: ordered, index-addressable per-step records.
//!
//! RULES:
//!   - Indices are allocated here, 0-based, contiguous, in creation order.
//!   - Buffered mode keeps every step resident.
//!   - Streamed mode keeps at most one step resident: the open one.
//!     Once it is taken for writing it is sealed and gone from memory.

use crate::{
    config::RecordMode,
    error::{VisError, VisResult},
    snapshot::{ActorCollection, ActorSnapshot, LinkSnapshot, LocationSnapshot},
    types::StepIndex,
};
use serde::{Deserialize, Serialize};

/// Everything recorded for one simulated time unit.
///
/// The index is implied by array position in the output document and
/// is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(skip)]
    pub index:     StepIndex,
    #[serde(default)]
    pub locations: Vec<LocationSnapshot>,
    #[serde(default)]
    pub links:     Vec<LinkSnapshot>,
    #[serde(default)]
    pub actors:    ActorCollection,
    pub display:   String,
}

impl StepRecord {
    pub fn new(index: StepIndex, display: impl Into<String>) -> Self {
        Self {
            index,
            locations: Vec::new(),
            links:     Vec::new(),
            actors:    ActorCollection::new(),
            display:   display.into(),
        }
    }
}

#[derive(Debug)]
pub struct Timeline {
    mode:           RecordMode,
    resident:       Vec<StepRecord>,
    /// Index of `resident[0]`. Everything below it has been streamed.
    first_resident: StepIndex,
    next_index:     StepIndex,
}

impl Timeline {
    pub fn new(mode: RecordMode) -> Self {
        Self {
            mode,
            resident:       Vec::new(),
            first_resident: 0,
            next_index:     0,
        }
    }

    pub fn mode(&self) -> RecordMode { self.mode }

    /// Number of steps allocated so far, streamed or not.
    pub fn len(&self) -> StepIndex { self.next_index }
    pub fn is_empty(&self) -> bool { self.next_index == 0 }

    /// The most recently begun step, if it is still resident.
    pub fn open_step(&self) -> Option<StepIndex> {
        self.resident.last().map(|s| s.index)
    }

    /// Allocate the next step and return its index.
    pub fn begin_step(&mut self, display: impl Into<String>) -> VisResult<StepIndex> {
        if self.mode == RecordMode::Streamed {
            if let Some(open) = self.resident.first() {
                return Err(VisError::sequence(format!(
                    "step {} is still open; flush it before beginning step {}",
                    open.index, self.next_index
                )));
            }
        }
        let index = self.next_index;
        self.resident.push(StepRecord::new(index, display));
        self.next_index += 1;
        Ok(index)
    }

    /// Replace the locations and links recorded at `index`.
    pub fn set_locations_and_links(
        &mut self,
        index: StepIndex,
        locations: Vec<LocationSnapshot>,
        links: Vec<LinkSnapshot>,
    ) -> VisResult<()> {
        let step = self.slot_mut(index)?;
        step.locations = locations;
        step.links = links;
        Ok(())
    }

    /// Add one actor. Re-recording an id replaces it in place.
    /// Returns true when an earlier record was replaced.
    pub fn append_actor(&mut self, index: StepIndex, actor: ActorSnapshot) -> VisResult<bool> {
        Ok(self.slot_mut(index)?.actors.upsert(actor))
    }

    /// Replace every actor recorded at `index`. Later appends go after these.
    pub fn set_actors<I>(&mut self, index: StepIndex, actors: I) -> VisResult<()>
    where
        I: IntoIterator<Item = ActorSnapshot>,
    {
        let step = self.slot_mut(index)?;
        step.actors.clear();
        for actor in actors {
            step.actors.upsert(actor);
        }
        Ok(())
    }

    pub fn get(&self, index: StepIndex) -> VisResult<&StepRecord> {
        if index >= self.next_index {
            return Err(VisError::StepOutOfRange { index, len: self.next_index });
        }
        if index < self.first_resident {
            return Err(VisError::NotAvailable { index });
        }
        Ok(&self.resident[index - self.first_resident])
    }

    /// Streamed mode: remove the open step so it can be written.
    /// After this the step is sealed.
    pub fn take_open(&mut self, index: StepIndex) -> VisResult<StepRecord> {
        if self.mode != RecordMode::Streamed {
            return Err(VisError::sequence("only streamed timelines release steps"));
        }
        self.slot_mut(index)?;
        let step = self.resident.remove(0);
        self.first_resident = self.next_index;
        Ok(step)
    }

    /// Fails the way a record call at `index` would, without changing anything.
    pub fn check_writable(&mut self, index: StepIndex) -> VisResult<()> {
        self.slot_mut(index).map(|_| ())
    }

    /// Resident steps in index order. In buffered mode this is the whole run.
    pub fn steps(&self) -> &[StepRecord] {
        &self.resident
    }

    fn slot_mut(&mut self, index: StepIndex) -> VisResult<&mut StepRecord> {
        if index == self.next_index {
            return Err(VisError::sequence(format!(
                "step {index} recorded before begin_step"
            )));
        }
        if index > self.next_index {
            return Err(VisError::StepOutOfRange { index, len: self.next_index });
        }
        if index < self.first_resident {
            return Err(VisError::StepSealed { index });
        }
        Ok(&mut self.resident[index - self.first_resident])
    }
}
