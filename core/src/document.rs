//! The output document, as the front end reads it.
//!
//! Buffered mode writes one object:
//!   { "meta": RunMetadata, "data": [StepRecord, ...] }
//! Streamed mode writes the `data` array on its own and the `meta`
//! object to a separate file at finalize. Both load into `VisDocument`.

use crate::{
    error::{VisError, VisResult},
    metadata::RunMetadata,
    timeline::StepRecord,
    types::StepIndex,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Borrowed form written by the recorder, so steps are not cloned.
#[derive(Serialize)]
pub(crate) struct DocumentRef<'a> {
    pub meta: RunMetadata,
    pub data: &'a [StepRecord],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisDocument {
    pub meta: RunMetadata,
    pub data: Vec<StepRecord>,
}

impl VisDocument {
    /// Parse a buffered-mode document.
    pub fn from_json(json: &str) -> VisResult<Self> {
        let mut document: VisDocument = serde_json::from_str(json)?;
        renumber(&mut document.data);
        Ok(document)
    }

    pub fn load(path: &Path) -> VisResult<Self> {
        Self::from_json(&read(path)?)
    }

    /// Join a streamed step array with its metadata file.
    pub fn load_streamed(steps_path: &Path, metadata_path: &Path) -> VisResult<Self> {
        let mut data: Vec<StepRecord> = serde_json::from_str(&read(steps_path)?)?;
        renumber(&mut data);
        let meta: RunMetadata = serde_json::from_str(&read(metadata_path)?)?;
        Ok(Self { meta, data })
    }

    pub fn len(&self) -> StepIndex { self.data.len() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn step(&self, index: StepIndex) -> Option<&StepRecord> {
        self.data.get(index)
    }

    pub fn display_labels(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|s| s.display.as_str())
    }
}

fn read(path: &Path) -> VisResult<String> {
    std::fs::read_to_string(path).map_err(|source| VisError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn renumber(steps: &mut [StepRecord]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.index = index;
    }
}
