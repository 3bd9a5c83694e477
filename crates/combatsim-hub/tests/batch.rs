//! Batched runs across worker threads

use combatsim_core::{
    default_registry, Condition, Encounter, EndReason, PriorityRotation, ResourceKind,
    ResourcePool, Rotation, RotationCatalog, SimConfig, SimStatus, SpellBook, SpellDefinition,
    SpellEffect, SpellId, Unit, UnitId, UnitKind,
};
use combatsim_hub::{Error, Hub, HubConfig, IterationResult, WorkerInit};
use std::sync::Arc;

const STRIKE: SpellId = SpellId(1);

fn init(rotation: &str) -> WorkerInit {
    let data = SpellBook::new().with_spell(SpellDefinition::new(STRIKE, "Strike").with_effect(
        SpellEffect::Damage {
            base: 250.0,
            ap_coefficient: 0.0,
            sp_coefficient: 0.0,
            variance: 0.1,
        },
    ));

    let mut catalog = RotationCatalog::new();
    catalog.register_priority(PriorityRotation::new("strike").with_entry(STRIKE, Condition::Always));
    // Iteration 2 references a spell missing from the static data
    catalog.register("flaky", |sim_id| {
        let spell = if sim_id == 2 { SpellId(404) } else { STRIKE };
        Box::new(PriorityRotation::new("flaky").with_entry(spell, Condition::Always))
            as Box<dyn Rotation>
    });

    WorkerInit {
        rotation: rotation.to_string(),
        data: Arc::new(data),
        registry: Arc::new(default_registry()),
        catalog: Arc::new(catalog),
        encounter: Encounter {
            units: vec![
                Unit::new(UnitId(1), "player", UnitKind::Player)
                    .with_resource(ResourceKind::Health, ResourcePool::full(1000.0)),
                Unit::new(UnitId(2), "dummy", UnitKind::Enemy)
                    .with_resource(ResourceKind::Health, ResourcePool::full(1e9)),
            ],
            player: UnitId(1),
            target: UnitId(2),
        },
        config: SimConfig::default(),
        base_seed: 2024,
    }
}

#[test]
fn test_aborted_iteration_does_not_stop_batch() {
    let mut hub = Hub::new(HubConfig::with_worker_count(2).with_batch_size(1));
    hub.start(init("flaky")).unwrap();
    let outcome = hub.run(3, 30_000).unwrap();

    let statuses: Vec<(u64, bool)> = outcome
        .results
        .iter()
        .map(|r| (r.sim_id, r.is_completed()))
        .collect();
    assert_eq!(statuses, vec![(1, true), (2, false), (3, true)]);
    assert_eq!(
        outcome.results[0].status,
        SimStatus::Completed(EndReason::DurationElapsed)
    );
    assert!(outcome.results[1].status.is_aborted());
    assert_eq!(
        outcome.results[1].error.as_deref(),
        Some("Unknown spell: spell:404")
    );

    assert_eq!(outcome.summary.completed, 2);
    assert_eq!(outcome.summary.aborted, 1);
    assert!(outcome.summary.errors.contains_key(&2));
    hub.shutdown();
}

#[test]
fn test_results_independent_of_worker_count() {
    let run = |workers: usize, batch_size: usize| -> Vec<IterationResult> {
        let mut hub = Hub::new(HubConfig::with_worker_count(workers).with_batch_size(batch_size));
        hub.start(init("strike")).unwrap();
        hub.run(8, 20_000).unwrap().results
    };

    let single = run(1, 8);
    let spread = run(4, 3);
    assert_eq!(single, spread);
    assert_eq!(single.len(), 8);
    assert!(single.iter().all(|r| r.is_completed() && r.casts == 14));
}

#[test]
fn test_hub_reusable_across_runs() {
    let mut hub = Hub::default();
    hub.start(init("strike")).unwrap();
    let first = hub.run(2, 10_000).unwrap();
    let second = hub.run(2, 10_000).unwrap();
    assert_eq!(first, second);

    assert!(matches!(hub.start(init("strike")), Err(Error::AlreadyStarted)));
}

#[test]
fn test_unknown_rotation_rejected_at_start() {
    let mut hub = Hub::default();
    let err = hub.start(init("missing")).unwrap_err();
    assert!(matches!(err, Error::UnknownRotation(name) if name == "missing"));
    assert!(!hub.is_started());
}

#[test]
fn test_outcome_serializes() {
    let mut hub = Hub::default();
    hub.start(init("flaky")).unwrap();
    let outcome = hub.run(2, 5000).unwrap();
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"sim_id\":2"));
    assert!(json.contains("Unknown spell"));
}
