//! Run-wide metadata: normalization maxima and static run info.
//!
//! Maxima are tracked as data arrives. In streamed mode early steps are
//! gone from memory by the time the run ends, so they cannot be
//! recomputed afterwards.

use crate::{
    snapshot::{LinkSnapshot, LocationSnapshot},
    types::{Occupancy, NO_DATA},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Static description of a run, supplied by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Initial map centre, `[lat, lng]`.
    pub center:      [f64; 2],
    pub start_date:  NaiveDate,
    pub name:        String,
    #[serde(default)]
    pub description: String,
}

/// The `meta` block of the output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Highest location occupancy seen; negative = no data yet.
    #[serde(rename = "maxForLocation")]
    pub max_location_occupancy: i64,
    /// Highest link occupancy seen; negative = no data yet.
    #[serde(rename = "maxForLink")]
    pub max_link_occupancy:     i64,
    pub center:                 Option<[f64; 2]>,
    pub start_date:             Option<NaiveDate>,
    pub name:                   Option<String>,
    pub description:            Option<String>,
}

impl RunMetadata {
    pub fn has_location_data(&self) -> bool { self.max_location_occupancy >= 0 }
    pub fn has_link_data(&self) -> bool { self.max_link_occupancy >= 0 }
}

#[derive(Debug, Clone)]
pub struct MetadataAggregator {
    max_location: i64,
    max_link:     i64,
    info:         Option<RunInfo>,
}

impl Default for MetadataAggregator {
    fn default() -> Self {
        Self {
            max_location: NO_DATA,
            max_link:     NO_DATA,
            info:         None,
        }
    }
}

impl MetadataAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one step's snapshots into the running maxima.
    pub fn observe(&mut self, locations: &[LocationSnapshot], links: &[LinkSnapshot]) {
        for location in locations {
            self.max_location = self.max_location.max(as_signed(location.occupancy));
        }
        for link in links {
            self.max_link = self.max_link.max(as_signed(link.occupancy));
        }
    }

    /// Last call wins. A run may refine its description before finalize.
    pub fn set_run_info(&mut self, info: RunInfo) {
        if let Some(previous) = &self.info {
            log::debug!("run info '{}' replaced by '{}'", previous.name, info.name);
        }
        self.info = Some(info);
    }

    pub fn run_info(&self) -> Option<&RunInfo> {
        self.info.as_ref()
    }

    pub fn snapshot(&self) -> RunMetadata {
        RunMetadata {
            max_location_occupancy: self.max_location,
            max_link_occupancy:     self.max_link,
            center:                 self.info.as_ref().map(|i| i.center),
            start_date:             self.info.as_ref().map(|i| i.start_date),
            name:                   self.info.as_ref().map(|i| i.name.clone()),
            description:            self.info.as_ref().map(|i| i.description.clone()),
        }
    }
}

fn as_signed(occupancy: Occupancy) -> i64 {
    i64::try_from(occupancy).unwrap_or(i64::MAX)
}
