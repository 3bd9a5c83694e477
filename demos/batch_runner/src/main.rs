//! Batch Runner Example
//!
//! Loads an encounter, its spells and rotations from a directory of RON
//! files and simulates it many times across worker threads.
//!
//! ```text
//! cargo run -p batch_runner -- run --rotation arms --iterations 1000 --workers 4
//! cargo run -p batch_runner -- single --rotation arms --seed 7
//! ```
//!
//! Set `RUST_LOG=debug` to see per-batch progress, `RUST_LOG=combatsim_core=debug`
//! for every dispatched event.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use combatsim_core::{default_registry, SimConfig, Simulation};
use combatsim_hub::{Hub, HubConfig, WorkerInit};
use combatsim_script::{GameData, Loader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Run combat simulations from RON scripts
#[derive(Parser)]
#[command(name = "batch_runner")]
#[command(about = "Simulate a scripted encounter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run many iterations across worker threads and summarize DPS
    Run(RunArgs),

    /// Run one iteration and print its full report
    Single(SingleArgs),
}

#[derive(Args)]
struct DataArgs {
    /// Directory of RON files
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/data"))]
    data: PathBuf,

    /// Rotation to drive the player with
    #[arg(long, default_value = "arms")]
    rotation: String,

    /// Encounter length in milliseconds (defaults to the encounter's own)
    #[arg(long)]
    duration: Option<u64>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    data: DataArgs,

    #[arg(long, short = 'n', default_value_t = 100)]
    iterations: u64,

    /// Worker threads, clamped to the number of CPUs
    #[arg(long, short = 'w', default_value_t = 1)]
    workers: usize,

    #[arg(long, default_value_t = 25)]
    batch_size: usize,

    /// Base seed; each iteration derives its own from this and its id
    #[arg(long)]
    seed: Option<u64>,

    /// Print every iteration result as JSON instead of the summary
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SingleArgs {
    #[command(flatten)]
    data: DataArgs,

    #[arg(long)]
    seed: Option<u64>,

    /// Include the combat log in the JSON output
    #[arg(long)]
    log: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args),
        Command::Single(args) => single(args),
    }
}

fn load(args: &DataArgs) -> Result<(GameData, SimConfig)> {
    let mut loader = Loader::new();
    loader
        .load_directory(&args.data)
        .with_context(|| format!("loading scripts from {}", args.data.display()))?;
    let data = loader.finish().context("validating scripts")?;

    if data.get_rotation(&args.rotation).is_none() {
        let known: Vec<_> = data.rotations.iter().map(|r| r.name.as_str()).collect();
        bail!("unknown rotation '{}' (have: {})", args.rotation, known.join(", "));
    }

    let mut config = data
        .encounter
        .as_ref()
        .map(|e| e.config.clone())
        .unwrap_or_default();
    if let Some(duration) = args.duration {
        config = config.with_duration(duration);
    }
    Ok((data, config))
}

fn run(args: RunArgs) -> Result<()> {
    let (data, config) = load(&args.data)?;
    let duration = config.duration_ms;
    let base_seed = args.seed.unwrap_or(config.seed);

    let init = WorkerInit {
        rotation: args.data.rotation.clone(),
        encounter: data.encounter()?,
        catalog: Arc::new(data.catalog()),
        data: Arc::new(data.book),
        registry: Arc::new(default_registry()),
        config,
        base_seed,
    };

    let mut hub = Hub::new(
        HubConfig::with_worker_count(args.workers).with_batch_size(args.batch_size),
    );
    hub.start(init).context("starting workers")?;
    info!(workers = hub.worker_count(), iterations = args.iterations, "Simulating");

    let outcome = hub.run(args.iterations, duration)?;
    hub.shutdown();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let s = &outcome.summary;
    println!("=== {} x {} ({} ms) ===", args.data.rotation, s.iterations, duration);
    println!("  completed: {}  aborted: {}  degraded: {}", s.completed, s.aborted, s.degraded);
    println!(
        "  dps: mean {:.1}  min {:.1}  max {:.1}  std-dev {:.1}",
        s.mean_dps, s.min_dps, s.max_dps, s.std_dev_dps
    );
    println!("  casts per iteration: {:.1}", s.mean_casts);
    for (sim_id, error) in &s.errors {
        println!("  iteration {}: {}", sim_id, error);
    }
    Ok(())
}

fn single(args: SingleArgs) -> Result<()> {
    let (data, mut config) = load(&args.data)?;
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config = config.with_log(args.log);

    let encounter = data.encounter()?;
    let catalog = data.catalog();
    let rotation = catalog
        .build(&args.data.rotation, 1)
        .context("rotation disappeared from catalog")?;

    let mut sim = Simulation::from_encounter(
        &encounter,
        config,
        Arc::new(data.book),
        Arc::new(default_registry()),
    )?;
    sim.set_rotation(rotation);
    let report = sim.run()?;

    if args.log {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== {} ===", report.status);
    println!(
        "  {:.0} damage in {} ms ({:.1} dps), {} casts, {} failed",
        report.total_damage, report.duration_ms, report.dps, report.casts, report.failed_casts
    );
    for spell in &report.spells {
        println!("  {:<16} {:>4} casts {:>10.0} damage", spell.name, spell.casts, spell.damage);
    }
    if let Some(error) = &report.error {
        println!("  aborted: {}", error);
    }
    Ok(())
}
