//! The demo's data directory loads, validates and simulates

use combatsim_core::{default_registry, EndReason, SimStatus, Simulation, SpellId, UnitId};
use combatsim_script::{Error, Loader};
use std::path::PathBuf;
use std::sync::Arc;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/batch_runner/data")
}

#[test]
fn test_load_demo_directory() {
    let mut loader = Loader::new();
    loader.load_directory(data_dir()).unwrap();
    let data = loader.finish().unwrap();

    assert_eq!(data.book.spells.len(), 6);
    assert_eq!(data.book.auras.len(), 2);
    assert!(data.get_rotation("arms").is_some());
    assert!(data.get_rotation("slam_only").is_some());

    let encounter = data.encounter().unwrap();
    assert_eq!(encounter.player, UnitId(1));
    assert_eq!(encounter.target, UnitId(2));
    assert_eq!(encounter.units[0].items.len(), 2);
}

#[test]
fn test_demo_encounter_runs() {
    let mut loader = Loader::new();
    loader.load_directory(data_dir()).unwrap();
    let data = loader.finish().unwrap();

    let config = data.encounter.as_ref().unwrap().config.clone().with_duration(30_000);
    let encounter = data.encounter().unwrap();
    let rotation = data.catalog().build("arms", 1).unwrap();

    let mut sim = Simulation::from_encounter(
        &encounter,
        config,
        Arc::new(data.book),
        Arc::new(default_registry()),
    )
    .unwrap();
    sim.set_rotation(rotation);
    let report = sim.run().unwrap();

    assert_eq!(report.status, SimStatus::Completed(EndReason::DurationElapsed));
    assert!(report.casts > 0);
    assert!(report.total_damage > 0.0);
    assert!(report.spells.iter().any(|s| s.spell == SpellId(1) && s.casts > 0));
}

#[test]
fn test_load_missing_directory() {
    let mut loader = Loader::new();
    let err = loader.load_directory(data_dir().join("missing")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
