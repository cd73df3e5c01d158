//! Recorder configuration.
//!
//! Loaded from a JSON file by the runner; tests build it in code
//! with `RecorderConfig::default_test()`.

use crate::{
    error::{VisError, VisResult},
    metadata::RunInfo,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How steps reach the sink.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Keep every step in memory; write one document at finalize.
    #[default]
    Buffered,
    /// Write each step as it completes; keep only aggregate state.
    Streamed,
}

impl std::fmt::Display for RecordMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered => f.write_str("buffered"),
            Self::Streamed => f.write_str("streamed"),
        }
    }
}

impl std::str::FromStr for RecordMode {
    type Err = VisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffered" => Ok(Self::Buffered),
            "streamed" => Ok(Self::Streamed),
            other => Err(VisError::Config {
                path:   "<mode>".into(),
                reason: format!("unknown record mode '{other}' (expected buffered|streamed)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    pub output_path:     PathBuf,
    #[serde(default)]
    pub mode:            RecordMode,
    /// Streamed mode: flush the sink after every step so a partial run
    /// can be inspected while the simulation is still going.
    #[serde(default = "default_flush_each_step")]
    pub flush_each_step: bool,
    /// Streamed mode: where the metadata is written at finalize.
    /// Defaults to `<stem>.meta.json` beside the output.
    #[serde(default)]
    pub metadata_path:   Option<PathBuf>,
    /// Run info applied when the recorder opens. The driver may still
    /// override it with `set_run_info`.
    #[serde(default)]
    pub run:             Option<RunInfo>,
}

fn default_flush_each_step() -> bool { true }

impl RecorderConfig {
    pub fn new(output_path: impl Into<PathBuf>, mode: RecordMode) -> Self {
        Self {
            output_path: output_path.into(),
            mode,
            flush_each_step: true,
            metadata_path: None,
            run: None,
        }
    }

    /// Load from a JSON config file.
    pub fn load(path: &str) -> VisResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VisError::Config {
            path:   path.to_string(),
            reason: format!("cannot read: {e}"),
        })?;
        serde_json::from_str(&content).map_err(|e| VisError::Config {
            path:   path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Buffered config writing to `output_path`, for unit tests.
    pub fn default_test(output_path: impl Into<PathBuf>) -> Self {
        Self::new(output_path, RecordMode::Buffered)
    }

    pub fn streamed(mut self) -> Self {
        self.mode = RecordMode::Streamed;
        self
    }

    pub fn resolved_metadata_path(&self) -> PathBuf {
        self.metadata_path
            .clone()
            .unwrap_or_else(|| sidecar_path(&self.output_path))
    }
}

/// `out/run.json` → `out/run.meta.json`
pub fn sidecar_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vis".to_string());
    output.with_file_name(format!("{stem}.meta.json"))
}
