//! Property tests for queue ordering, resource bounds and aura stacking

use combatsim_core::{
    default_registry, AuraDefinition, CombatLogEvent, EffectTarget, EventPayload, EventQueue,
    ResourceKind, ResourcePool, SimConfig, SimTime, Simulation, SpellBook, SpellDefinition,
    SpellEffect, SpellId, Unit, UnitId, UnitKind,
};
use proptest::prelude::*;
use std::sync::Arc;

const PLAYER: UnitId = UnitId(1);
const BOSS: UnitId = UnitId(2);
const SUNDER: SpellId = SpellId(1);
const DOUBLE_SUNDER: SpellId = SpellId(2);
const SUNDER_MS: SimTime = 15_000;
const SUNDER_STACKS: u8 = 5;

fn sunder_sim() -> Simulation {
    let apply = SpellEffect::ApplyAura {
        aura: SUNDER,
        on: EffectTarget::Target,
    };
    let book = SpellBook::new()
        .with_spell(SpellDefinition::new(SUNDER, "Sunder").off_gcd().with_effect(apply.clone()))
        .with_spell(
            SpellDefinition::new(DOUBLE_SUNDER, "Double Sunder")
                .off_gcd()
                .with_effect(apply.clone())
                .with_effect(apply),
        )
        .with_aura(AuraDefinition::new(SUNDER, "Sunder", SUNDER_MS).with_max_stacks(SUNDER_STACKS));

    let mut sim = Simulation::new(
        SimConfig::default().with_duration(10_000_000),
        Arc::new(book),
        Arc::new(default_registry()),
    );
    sim.add_unit(
        Unit::new(PLAYER, "warrior", UnitKind::Player)
            .with_resource(ResourceKind::Health, ResourcePool::full(5000.0)),
    )
    .unwrap();
    sim.add_unit(
        Unit::new(BOSS, "dummy", UnitKind::Enemy)
            .with_resource(ResourceKind::Health, ResourcePool::full(1_000_000.0)),
    )
    .unwrap();
    sim.set_actors(PLAYER, BOSS).unwrap();
    sim
}

fn energize(tag: f64) -> CombatLogEvent {
    CombatLogEvent::new(
        UnitId(1),
        UnitId(1),
        SpellId(1),
        EventPayload::Energize {
            amount: tag,
            power: ResourceKind::Mana,
        },
    )
}

proptest! {
    #[test]
    fn test_queue_pops_by_time_then_insertion(due in prop::collection::vec(0u64..50, 1..200)) {
        let mut queue = EventQueue::new();
        for (i, t) in due.iter().enumerate() {
            queue.schedule(energize(i as f64), *t).unwrap();
        }

        let mut expected: Vec<(u64, usize)> = due.iter().copied().zip(0..).collect();
        expected.sort();

        let popped: Vec<(u64, usize)> = queue
            .drain_due(u64::MAX)
            .iter()
            .map(|e| (e.timestamp, e.amount().unwrap() as usize))
            .collect();
        prop_assert_eq!(popped, expected);
    }

    #[test]
    fn test_cancelled_events_never_fire(
        due in prop::collection::vec(0u64..100, 1..100),
        cancel_mask in prop::collection::vec(any::<bool>(), 100),
    ) {
        let mut queue = EventQueue::new();
        let ids: Vec<_> = due
            .iter()
            .enumerate()
            .map(|(i, t)| queue.schedule(energize(i as f64), *t).unwrap())
            .collect();
        let mut kept = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if cancel_mask[i] {
                queue.cancel(*id);
            } else {
                kept.push(i);
            }
        }

        let mut fired: Vec<usize> = queue
            .drain_due(u64::MAX)
            .iter()
            .map(|e| e.amount().unwrap() as usize)
            .collect();
        fired.sort();
        prop_assert_eq!(fired, kept);
    }

    #[test]
    fn test_resource_pool_stays_in_bounds(
        max in 1.0f64..10_000.0,
        ops in prop::collection::vec((any::<bool>(), 0.0f64..20_000.0), 0..100),
    ) {
        let mut pool = ResourcePool::full(max);
        for (gain, amount) in ops {
            if gain {
                let overflow = pool.gain(amount);
                prop_assert!(overflow >= 0.0);
            } else {
                let taken = pool.spend(amount);
                prop_assert!(taken <= amount);
            }
            prop_assert!(pool.in_bounds());
        }
    }

    #[test]
    fn test_aura_stacks_stay_bounded(
        steps in prop::collection::vec((0u64..20_000, prop::collection::vec(any::<bool>(), 1..4)), 1..30),
    ) {
        let mut sim = sunder_sim();
        let mut now: SimTime = 0;
        let mut stacks: u8 = 0;
        let mut expires_at: SimTime = 0;

        for (gap, casts) in steps {
            now += gap;
            sim.advance_to(now).unwrap();
            if expires_at <= now {
                stacks = 0;
            }

            for double in casts {
                let spell = if double { DOUBLE_SUNDER } else { SUNDER };
                prop_assert!(sim.cast(PLAYER, spell, BOSS).unwrap().is_started());
                let applications = if double { 2 } else { 1 };
                stacks = (stacks + applications).min(SUNDER_STACKS);
                expires_at = now + SUNDER_MS;
            }

            let aura = &sim.state().unit(BOSS).unwrap().auras[&SUNDER];
            prop_assert!(aura.stacks >= 1 && aura.stacks <= SUNDER_STACKS);
            prop_assert_eq!(aura.stacks, stacks);
            prop_assert_eq!(aura.expires_at, expires_at);
        }
    }
}
