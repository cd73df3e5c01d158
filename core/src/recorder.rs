//! The recorder: the façade the simulation driver talks to.
//!
//! Per step the driver calls, in order:
//!   1. begin_step(label)
//!   2. record_locations_and_links(..)   any number of times
//!   3. record_actor(..) / record_actors(..)
//!   4. flush_step(index)                streamed mode only
//! and calls finalize() once when the run ends.
//!
//! RULES:
//!   - The sink is acquired when the recorder is constructed and released
//!     exactly once: by finalize, by abort, on a fatal write error, or on drop.
//!   - A write failure is fatal. The sink is released and the recorder closes.
//!   - After close every mutator fails with `VisError::Closed`.
//!   - Run maxima are folded in as data arrives, before any step is
//!     streamed and dropped.

use crate::{
    config::{RecordMode, RecorderConfig},
    document::DocumentRef,
    entity::{VisActor, VisLocation},
    error::{VisError, VisResult},
    metadata::{MetadataAggregator, RunInfo, RunMetadata},
    sink::Sink,
    snapshot::{check_finite, encode_actor, encode_locations_and_links, LinkSnapshot, LocationSnapshot},
    timeline::{StepRecord, Timeline},
    types::StepIndex,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// Sink acquired, no step begun yet.
    Open,
    /// At least one step begun.
    Recording,
    /// Sink released. Only finalize/close are accepted.
    Closed,
}

/// What a finished recording produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub mode:            RecordMode,
    pub steps:           StepIndex,
    pub output:          String,
    /// Streamed mode: where the metadata went.
    pub metadata_output: Option<String>,
    pub bytes_written:   u64,
    pub meta:            RunMetadata,
}

impl fmt::Display for RecordingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps ({}) to {}, {} bytes, max location occupancy {}, max link occupancy {}",
            self.steps,
            self.mode,
            self.output,
            self.bytes_written,
            self.meta.max_location_occupancy,
            self.meta.max_link_occupancy,
        )?;
        if let Some(meta_out) = &self.metadata_output {
            write!(f, ", metadata in {meta_out}")?;
        }
        Ok(())
    }
}

pub struct VisRecorder {
    state:           RecorderState,
    sink:            Sink,
    /// Streamed mode only. Receives the metadata once, at finalize.
    metadata_sink:   Option<Sink>,
    timeline:        Timeline,
    metadata:        MetadataAggregator,
    flush_each_step: bool,
    steps_written:   StepIndex,
    summary:         Option<RecordingSummary>,
}

impl VisRecorder {
    /// Open the sinks named by `config`. Fails before any step is
    /// accepted if an output cannot be created.
    pub fn open(config: &RecorderConfig) -> VisResult<Self> {
        let mut recorder = match config.mode {
            RecordMode::Buffered => Self::buffered(Sink::create(&config.output_path)?),
            RecordMode::Streamed => {
                let metadata_path = config.resolved_metadata_path();
                if metadata_path == config.output_path {
                    return Err(VisError::Config {
                        path:   config.output_path.display().to_string(),
                        reason: "metadata_path must differ from output_path in streamed mode".into(),
                    });
                }
                let sink = Sink::create_append(&config.output_path)?;
                let metadata_sink = Sink::create(&metadata_path)?;
                Self::streamed(sink, metadata_sink)?
            }
        };
        recorder.flush_each_step = config.flush_each_step;
        if let Some(info) = &config.run {
            recorder.metadata.set_run_info(info.clone());
        }
        Ok(recorder)
    }

    /// Record into an already-open sink; one document is written at finalize.
    pub fn buffered(sink: Sink) -> Self {
        log::info!("recording (buffered) to {}", sink.target());
        Self::with_parts(RecordMode::Buffered, sink, None)
    }

    /// Stream steps into `sink`; the metadata goes to `metadata_sink` at finalize.
    /// The opening bracket is written immediately.
    pub fn streamed(sink: Sink, metadata_sink: Sink) -> VisResult<Self> {
        log::info!(
            "recording (streamed) to {}, metadata to {}",
            sink.target(),
            metadata_sink.target()
        );
        let mut recorder = Self::with_parts(RecordMode::Streamed, sink, Some(metadata_sink));
        let preamble = recorder.sink.write_str("[");
        recorder.guard(preamble)?;
        let flushed = recorder.sink.flush();
        recorder.guard(flushed)?;
        Ok(recorder)
    }

    /// Open, run `body`, then finalize. If `body` fails the sinks are
    /// released without writing the closing structure, and the body's
    /// error is returned.
    pub fn record<F, E>(config: &RecorderConfig, body: F) -> Result<RecordingSummary, E>
    where
        F: FnOnce(&mut VisRecorder) -> Result<(), E>,
        E: From<VisError>,
    {
        let mut recorder = Self::open(config)?;
        match body(&mut recorder) {
            Ok(()) => Ok(recorder.finalize()?),
            Err(e) => {
                recorder.abort();
                Err(e)
            }
        }
    }

    fn with_parts(mode: RecordMode, sink: Sink, metadata_sink: Option<Sink>) -> Self {
        Self {
            state: RecorderState::Open,
            sink,
            metadata_sink,
            timeline: Timeline::new(mode),
            metadata: MetadataAggregator::new(),
            flush_each_step: true,
            steps_written: 0,
            summary: None,
        }
    }

    pub fn state(&self) -> RecorderState { self.state }
    pub fn mode(&self) -> RecordMode { self.timeline.mode() }
    pub fn is_closed(&self) -> bool { self.state == RecorderState::Closed }

    /// Steps begun so far.
    pub fn steps_recorded(&self) -> StepIndex { self.timeline.len() }

    /// Steps already written to the sink (streamed mode).
    pub fn steps_written(&self) -> StepIndex { self.steps_written }

    // ── Step lifecycle ─────────────────────────────────────────

    pub fn begin_step(&mut self, display: impl Into<String>) -> VisResult<StepIndex> {
        self.ensure_open()?;
        let display = display.into();
        let index = self.timeline.begin_step(display.clone())?;
        self.state = RecorderState::Recording;
        log::debug!("step={index} begun: {display}");
        Ok(index)
    }

    /// Encode `locations` (and their outgoing links) into step `index`.
    pub fn record_locations_and_links<'a, L, I>(
        &mut self,
        index: StepIndex,
        locations: I,
    ) -> VisResult<()>
    where
        L: VisLocation + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        self.ensure_open()?;
        self.timeline.check_writable(index)?;
        let (locations, links) = encode_locations_and_links(locations);
        self.record_snapshots(index, locations, links)
    }

    /// Store pre-encoded snapshots at `index`, replacing earlier ones.
    pub fn record_snapshots(
        &mut self,
        index: StepIndex,
        locations: Vec<LocationSnapshot>,
        links: Vec<LinkSnapshot>,
    ) -> VisResult<()> {
        self.ensure_open()?;
        // Validate first so a rejected call never moves the maxima.
        self.timeline.check_writable(index)?;
        check_finite(&locations, &links)?;
        self.metadata.observe(&locations, &links);
        log::debug!(
            "step={index} recorded {} locations, {} links",
            locations.len(),
            links.len()
        );
        self.timeline.set_locations_and_links(index, locations, links)
    }

    /// Append one actor to step `index`. Recording the same actor again
    /// in the same step replaces its earlier record.
    pub fn record_actor<A: VisActor + ?Sized>(&mut self, index: StepIndex, actor: &A) -> VisResult<()> {
        self.ensure_open()?;
        self.timeline.check_writable(index)?;
        let snapshot = encode_actor(actor)?;
        if self.timeline.append_actor(index, snapshot)? {
            log::debug!("step={index} actor {} re-recorded", actor.actor_id());
        }
        Ok(())
    }

    /// Replace every actor at step `index`. All actors are encoded before
    /// anything is stored, so a failing export leaves the step unchanged.
    pub fn record_actors<'a, A, I>(&mut self, index: StepIndex, actors: I) -> VisResult<()>
    where
        A: VisActor + ?Sized + 'a,
        I: IntoIterator<Item = &'a A>,
    {
        self.ensure_open()?;
        self.timeline.check_writable(index)?;
        let snapshots = actors
            .into_iter()
            .map(|a| encode_actor(a))
            .collect::<VisResult<Vec<_>>>()?;
        self.timeline.set_actors(index, snapshots)
    }

    /// Streamed mode: write step `index` and drop it from memory.
    /// Buffered mode: checks the index and otherwise does nothing.
    pub fn flush_step(&mut self, index: StepIndex) -> VisResult<()> {
        self.ensure_open()?;
        match self.timeline.mode() {
            RecordMode::Buffered => self.timeline.check_writable(index),
            RecordMode::Streamed => {
                let step = self.timeline.take_open(index)?;
                self.write_step(&step)
            }
        }
    }

    // ── Metadata ───────────────────────────────────────────────

    /// Last call wins.
    pub fn set_run_info(&mut self, info: RunInfo) -> VisResult<()> {
        self.ensure_open()?;
        self.metadata.set_run_info(info);
        Ok(())
    }

    /// Current run metadata. Valid at any point, including after close.
    pub fn metadata(&self) -> RunMetadata {
        self.metadata.snapshot()
    }

    // ── Reads ──────────────────────────────────────────────────

    /// A resident step. In streamed mode only the open step is resident.
    pub fn step(&self, index: StepIndex) -> VisResult<&StepRecord> {
        self.timeline.get(index)
    }

    // ── Finalize ───────────────────────────────────────────────

    /// Write the closing structure and metadata, then release the sinks.
    /// Calling it again returns the same summary.
    pub fn finalize(&mut self) -> VisResult<RecordingSummary> {
        if self.state == RecorderState::Closed {
            return self.summary.clone().ok_or(VisError::Closed);
        }

        let metadata_output = match self.timeline.mode() {
            RecordMode::Buffered => {
                self.finalize_buffered()?;
                None
            }
            RecordMode::Streamed => Some(self.finalize_streamed()?),
        };

        let closed = self.sink.close();
        self.guard(closed)?;
        self.state = RecorderState::Closed;

        let summary = RecordingSummary {
            mode: self.timeline.mode(),
            steps: self.timeline.len(),
            output: self.sink.target().to_string(),
            metadata_output,
            bytes_written: self.sink.bytes_written(),
            meta: self.metadata.snapshot(),
        };
        log::info!("recording finished: {summary}");
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Finalize if still open. Closing twice is a no-op.
    pub fn close(&mut self) -> VisResult<()> {
        if self.state == RecorderState::Closed {
            return Ok(());
        }
        self.finalize().map(|_| ())
    }

    /// Release the sinks without completing the document.
    pub fn abort(&mut self) {
        if self.state == RecorderState::Closed {
            return;
        }
        log::warn!(
            "recording to {} aborted after {} steps; output is incomplete",
            self.sink.target(),
            self.timeline.len()
        );
        self.release();
    }

    fn finalize_buffered(&mut self) -> VisResult<()> {
        let document = DocumentRef {
            meta: self.metadata.snapshot(),
            data: self.timeline.steps(),
        };
        let json = serde_json::to_string(&document);
        let json = self.guard(json.map_err(VisError::from))?;
        let written = self.sink.write_str(&json);
        self.guard(written)
    }

    fn finalize_streamed(&mut self) -> VisResult<String> {
        if let Some(open) = self.timeline.open_step() {
            log::debug!("step={open} still open at finalize; streaming it");
            let step = self.timeline.take_open(open);
            let step = self.guard(step)?;
            self.write_step(&step)?;
        }
        let closing = if self.steps_written == 0 { "]\n" } else { "\n]\n" };
        let written = self.sink.write_str(closing);
        self.guard(written)?;

        let meta = serde_json::to_string_pretty(&self.metadata.snapshot());
        let meta = self.guard(meta.map_err(VisError::from))?;
        let Some(metadata_sink) = self.metadata_sink.as_mut() else {
            return Err(VisError::sequence("streamed recorder has no metadata sink"));
        };
        let written = metadata_sink.write_str(&meta).and_then(|_| metadata_sink.close());
        let target = metadata_sink.target().to_string();
        self.guard(written)?;
        Ok(target)
    }

    fn write_step(&mut self, step: &StepRecord) -> VisResult<()> {
        let json = serde_json::to_string(step);
        let json = self.guard(json.map_err(VisError::from))?;
        let separator = if self.steps_written == 0 { "\n" } else { ",\n" };
        let written = self
            .sink
            .write_str(separator)
            .and_then(|_| self.sink.write_str(&json));
        self.guard(written)?;
        if self.flush_each_step {
            let flushed = self.sink.flush();
            self.guard(flushed)?;
        }
        self.steps_written += 1;
        log::debug!("step={} streamed ({} bytes)", step.index, json.len());
        Ok(())
    }

    fn ensure_open(&self) -> VisResult<()> {
        if self.state == RecorderState::Closed {
            return Err(VisError::Closed);
        }
        Ok(())
    }

    /// Any failure passing through here ends the run and releases the sinks.
    fn guard<T>(&mut self, result: VisResult<T>) -> VisResult<T> {
        if let Err(e) = &result {
            log::error!("recording to {} failed: {e}", self.sink.target());
            self.release();
        }
        result
    }

    fn release(&mut self) {
        self.sink.release();
        if let Some(metadata_sink) = self.metadata_sink.as_mut() {
            metadata_sink.release();
        }
        self.state = RecorderState::Closed;
    }
}

impl Drop for VisRecorder {
    fn drop(&mut self) {
        if self.state != RecorderState::Closed {
            log::warn!(
                "recorder for {} dropped without finalize; output is incomplete",
                self.sink.target()
            );
            self.release();
        }
    }
}

impl fmt::Debug for VisRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisRecorder")
            .field("state", &self.state)
            .field("mode", &self.timeline.mode())
            .field("sink", &self.sink)
            .field("steps_recorded", &self.timeline.len())
            .field("steps_written", &self.steps_written)
            .finish()
    }
}
