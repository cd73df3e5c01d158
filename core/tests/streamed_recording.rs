//! Streamed-mode recorder tests.
//!
//! Tests cover: always-balanced output, partial-run inspection,
//! the metadata sidecar, sequencing, sealed steps, fatal write errors,
//! release on drop.

mod common;

use common::{init_logging, place, route_to, walker, FailingWriter, SharedBuf};
use simvis_core::{
    config::sidecar_path,
    document::VisDocument,
    error::VisError,
    metadata::RunMetadata,
    sink::Sink,
    timeline::StepRecord,
    RecordMode, RecorderConfig, RecorderState, VisRecorder,
};
use std::fs;
use tempfile::tempdir;

fn memory_recorder() -> (VisRecorder, SharedBuf, SharedBuf) {
    let steps = SharedBuf::default();
    let meta = SharedBuf::default();
    let recorder = VisRecorder::streamed(
        Sink::from_writer(steps.clone(), "steps"),
        Sink::from_writer(meta.clone(), "meta"),
    )
    .unwrap();
    (recorder, steps, meta)
}

#[test]
fn zero_steps_still_produce_a_complete_array() {
    let (mut recorder, steps, meta) = memory_recorder();
    assert_eq!(steps.contents(), "[", "opening bracket is written on open");

    let summary = recorder.finalize().unwrap();
    assert_eq!(summary.steps, 0);

    let parsed: Vec<StepRecord> = serde_json::from_str(&steps.contents()).unwrap();
    assert!(parsed.is_empty());
    let meta: RunMetadata = serde_json::from_str(&meta.contents()).unwrap();
    assert_eq!(meta.max_location_occupancy, -1);
}

#[test]
fn steps_stream_as_one_json_array() {
    init_logging();
    let (mut recorder, steps, _meta) = memory_recorder();

    for day in 0..4u64 {
        let t = recorder.begin_step(format!("day {day}")).unwrap();
        recorder.record_locations_and_links(t, &[place("Gao", day * 3)]).unwrap();
        recorder.record_actor(t, &walker(day, "moving")).unwrap();
        recorder.flush_step(t).unwrap();
        assert_eq!(recorder.steps_written(), day as usize + 1);
    }
    recorder.finalize().unwrap();

    let parsed: Vec<StepRecord> = serde_json::from_str(&steps.contents()).unwrap();
    assert_eq!(parsed.len(), 4);
    assert_eq!(parsed[2].display, "day 2");
    assert_eq!(parsed[3].locations[0].occupancy, 9);
    assert_eq!(parsed[1].actors.ids().collect::<Vec<_>>(), [1]);
}

/// After each flushed step the file holds a valid array prefix.
#[test]
fn partial_run_is_inspectable_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    let mut recorder = VisRecorder::open(&RecorderConfig::new(&path, RecordMode::Streamed)).unwrap();

    for day in 0..2 {
        let t = recorder.begin_step(format!("day {day}")).unwrap();
        recorder.record_locations_and_links(t, &[place("Gao", day)]).unwrap();
        recorder.flush_step(t).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        let closed = format!("{on_disk}]");
        let parsed: Vec<StepRecord> = serde_json::from_str(&closed).unwrap();
        assert_eq!(parsed.len(), day as usize + 1);
    }
    recorder.finalize().unwrap();
}

/// Maxima include steps that are long gone from memory.
#[test]
fn metadata_sidecar_is_written_once_at_finalize() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    let config = RecorderConfig::new(&path, RecordMode::Streamed);
    let mut recorder = VisRecorder::open(&config).unwrap();

    let gao = place("Gao", 0);
    for occupancy in [5, 12, 3] {
        let t = recorder.begin_step(format!("occ {occupancy}")).unwrap();
        let mut kidal = place("Kidal", occupancy);
        kidal.routes = vec![route_to(&gao, occupancy * 2)];
        recorder.record_locations_and_links(t, &[kidal]).unwrap();
        recorder.flush_step(t).unwrap();
    }

    let meta_path = sidecar_path(&path);
    assert_eq!(meta_path, dir.path().join("run.meta.json"));
    assert_eq!(fs::read_to_string(&meta_path).unwrap(), "", "nothing before finalize");

    let summary = recorder.finalize().unwrap();
    assert_eq!(summary.metadata_output.as_deref(), Some(meta_path.display().to_string().as_str()));

    let document = VisDocument::load_streamed(&path, &meta_path).unwrap();
    assert_eq!(document.len(), 3);
    assert_eq!(document.meta.max_location_occupancy, 12);
    assert_eq!(document.meta.max_link_occupancy, 24);
    assert_eq!(document.step(1).unwrap().index, 1);
}

#[test]
fn begin_twice_without_flush_is_a_sequence_error() {
    let (mut recorder, _steps, _meta) = memory_recorder();
    recorder.begin_step("first").unwrap();
    let err = recorder.begin_step("second").unwrap_err();
    assert!(matches!(err, VisError::Sequence { .. }), "got {err:?}");
    assert_eq!(recorder.state(), RecorderState::Recording);
}

#[test]
fn streamed_step_cannot_be_changed_or_read() {
    let (mut recorder, _steps, _meta) = memory_recorder();
    let t = recorder.begin_step("sealed").unwrap();
    recorder.flush_step(t).unwrap();

    assert!(matches!(
        recorder.record_locations_and_links(t, &[place("Gao", 1)]),
        Err(VisError::StepSealed { index: 0 })
    ));
    assert!(matches!(recorder.record_actor(t, &walker(1, "x")), Err(VisError::StepSealed { .. })));
    assert!(matches!(recorder.step(t), Err(VisError::NotAvailable { index: 0 })));
    assert!(matches!(recorder.flush_step(t), Err(VisError::StepSealed { .. })));
    assert!(!VisError::NotAvailable { index: 0 }.is_fatal());
}

#[test]
fn open_step_is_streamed_at_finalize() {
    let (mut recorder, steps, _meta) = memory_recorder();
    let t = recorder.begin_step("flushed").unwrap();
    recorder.flush_step(t).unwrap();
    recorder.begin_step("left open").unwrap();
    let summary = recorder.finalize().unwrap();

    assert_eq!(summary.steps, 2);
    let parsed: Vec<StepRecord> = serde_json::from_str(&steps.contents()).unwrap();
    assert_eq!(parsed[1].display, "left open");
}

/// A write failure closes the recorder and surfaces SinkUnwritable.
#[test]
fn write_failure_is_fatal_and_releases_the_sink() {
    let sink = Sink::from_writer(FailingWriter { limit: 1, written: 0 }, "failing");
    let meta = Sink::from_writer(SharedBuf::default(), "meta");
    let mut recorder = VisRecorder::streamed(sink, meta).unwrap();

    let t = recorder.begin_step("doomed").unwrap();
    recorder.record_locations_and_links(t, &[place("Gao", 1)]).unwrap();
    let err = recorder.flush_step(t).unwrap_err();
    assert!(matches!(err, VisError::SinkUnwritable { .. }), "got {err:?}");
    assert!(err.is_fatal());

    assert_eq!(recorder.state(), RecorderState::Closed);
    assert!(matches!(recorder.begin_step("after"), Err(VisError::Closed)));
    assert!(matches!(recorder.finalize(), Err(VisError::Closed)));
}

/// Dropping without finalize releases the file; what was flushed stays.
#[test]
fn drop_without_finalize_releases_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dropped.json");
    {
        let mut recorder =
            VisRecorder::open(&RecorderConfig::new(&path, RecordMode::Streamed)).unwrap();
        let t = recorder.begin_step("only").unwrap();
        recorder.flush_step(t).unwrap();
    }
    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.starts_with('['));
    assert!(on_disk.contains("\"display\":\"only\""));
    assert!(!on_disk.trim_end().ends_with(']'), "no closing bracket without finalize");
}

#[test]
fn scoped_record_aborts_on_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("aborted.json");
    let config = RecorderConfig::new(&path, RecordMode::Streamed);

    let result = VisRecorder::record(&config, |rec| {
        let t = rec.begin_step("ok")?;
        rec.flush_step(t)?;
        rec.begin_step("a")?;
        rec.begin_step("b")?;
        Ok::<(), VisError>(())
    });
    assert!(matches!(result, Err(VisError::Sequence { .. })));

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(!on_disk.trim_end().ends_with(']'));
    assert_eq!(fs::read_to_string(sidecar_path(&path)).unwrap(), "");
}

#[test]
fn streamed_output_truncates_previous_runs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reused.json");
    fs::write(&path, "stale content from an earlier run").unwrap();

    let mut recorder = VisRecorder::open(&RecorderConfig::new(&path, RecordMode::Streamed)).unwrap();
    recorder.finalize().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "[]\n");
}

/// Steps and metadata sharing one file would overwrite each other.
#[test]
fn metadata_path_equal_to_output_is_rejected_at_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clash.json");
    let mut config = RecorderConfig::default_test(&path).streamed();
    config.metadata_path = Some(path.clone());

    let err = VisRecorder::open(&config).unwrap_err();
    assert!(matches!(err, VisError::Config { .. }), "got {err:?}");
    assert!(!path.exists(), "nothing is created when the config is rejected");
}

#[test]
fn unwritable_streamed_output_fails_at_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("out.json");
    let err = VisRecorder::open(&RecorderConfig::default_test(&path).streamed()).unwrap_err();
    assert!(matches!(err, VisError::SinkUnwritable { .. }), "got {err:?}");
}

#[test]
fn unwritable_sidecar_fails_at_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.json");
    let mut config = RecorderConfig::default_test(&path).streamed();
    config.metadata_path = Some(dir.path().join("missing-dir").join("out.meta.json"));

    let err = VisRecorder::open(&config).unwrap_err();
    match err {
        VisError::SinkUnwritable { target, .. } => assert!(target.contains("out.meta.json")),
        other => panic!("expected SinkUnwritable, got {other:?}"),
    }
}
