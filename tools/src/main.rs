//! vis-runner: headless driver that runs the demo world and records it.
//!
//! Usage:
//!   vis-runner --seed 12345 --steps 200 --out vis/general.json
//!   vis-runner --mode streamed --out vis/general.json --spawn 40
//!   vis-runner --config recorder.json

mod world;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use simvis_core::{
    ids::global_actor_ids,
    metadata::RunInfo,
    RecordMode, RecorderConfig, RecordingSummary, VisRecorder,
};
use std::env;
use world::DemoWorld;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let steps = parse_arg(&args, "--steps", 200u64);
    let spawn = parse_arg(&args, "--spawn", 25u64);

    let mut config = match flag_value(&args, "--config") {
        Some(path) => RecorderConfig::load(path)?,
        None => {
            let out = flag_value(&args, "--out").unwrap_or("vis/general.json");
            let mode: RecordMode = flag_value(&args, "--mode").unwrap_or("buffered").parse()?;
            RecorderConfig::new(out, mode)
        }
    };
    if config.run.is_none() {
        config.run = Some(RunInfo {
            center:      [16.3700359, -2.2900239],
            start_date:  NaiveDate::from_ymd_opt(2009, 12, 24).context("bad default start date")?,
            name:        "General".into(),
            description: format!("Demo world, seed {seed}"),
        });
    }
    let start_date = config
        .run
        .as_ref()
        .map(|r| r.start_date)
        .context("run info missing")?;

    if let Some(parent) = config.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }

    println!("vis-runner");
    println!("  seed:      {seed}");
    println!("  steps:     {steps}");
    println!("  spawn:     {spawn}");
    println!("  mode:      {}", config.mode);
    println!("  output:    {}", config.output_path.display());
    println!();

    let mut world = DemoWorld::new(seed);
    let summary = VisRecorder::record(&config, |recorder| -> Result<()> {
        let mut date = start_date;
        for t in 0..steps {
            world.spawn(spawn, global_actor_ids());
            world.evolve();

            let index = recorder.begin_step(date.format("%Y-%m-%d").to_string())?;
            anyhow::ensure!(index as u64 == t, "step index {index} does not match day {t}");
            recorder.record_locations_and_links(index, world.towns())?;
            recorder.record_actors(index, world.travellers())?;
            recorder.flush_step(index)?;

            date = date.succ_opt().context("calendar overflow")?;
        }
        Ok(())
    })?;

    log::info!("run complete: {summary}");
    print_summary(&summary, &world);
    Ok(())
}

fn print_summary(summary: &RecordingSummary, world: &DemoWorld) {
    println!("=== RUN SUMMARY ===");
    println!("  days simulated:  {}", world.day());
    println!("  travellers:      {}", world.travellers().len());
    println!("  steps recorded:  {}", summary.steps);
    println!("  bytes written:   {}", summary.bytes_written);
    println!("  max location:    {}", summary.meta.max_location_occupancy);
    println!("  max link:        {}", summary.meta.max_link_occupancy);
    println!("  output:          {}", summary.output);
    if let Some(meta) = &summary.metadata_output {
        println!("  metadata:        {meta}");
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
