//! Incremental visualization recorder for spatial agent simulations.
//!
//! A simulation driver hands the recorder its locations, links and actors
//! once per time step. The recorder keeps run-wide normalization maxima
//! and writes a JSON document for the map front end, either all at once
//! (buffered) or step by step (streamed).

pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod recorder;
pub mod sink;
pub mod snapshot;
pub mod timeline;
pub mod types;

pub use config::{RecordMode, RecorderConfig};
pub use error::{VisError, VisResult};
pub use recorder::{RecorderState, RecordingSummary, VisRecorder};
