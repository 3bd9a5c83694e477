//! Combatsim Core - deterministic discrete-event combat simulator
//!
//! This crate provides everything a single simulation iteration needs:
//! - Combat log events and the time-ordered event queue
//! - Combat state (units, resources, auras, cooldowns, casts)
//! - Handler registry dispatching events by subevent
//! - Spell lifecycle, aura and periodic-effect rules
//! - Rotations and the rotation driver
//! - The sim driver and its per-iteration report
//!
//! ## Determinism
//!
//! A run is a pure function of its seed, static data, encounter and
//! rotation. All randomness flows through [`RandomSource`]; every collection
//! that is iterated while mutating state is insertion-ordered.
//!
//! ## Example
//!
//! ```
//! use combatsim_core::{
//!     default_registry, Condition, PriorityRotation, ResourceKind, ResourcePool, SimConfig,
//!     Simulation, SpellBook, SpellDefinition, SpellId, Unit, UnitId, UnitKind,
//! };
//! use std::sync::Arc;
//!
//! let data = SpellBook::new()
//!     .with_spell(SpellDefinition::new(SpellId(1), "Strike").with_damage(100.0));
//! let mut sim = Simulation::new(
//!     SimConfig::default().with_duration(10_000),
//!     Arc::new(data),
//!     Arc::new(default_registry()),
//! );
//! sim.add_unit(
//!     Unit::new(UnitId(1), "player", UnitKind::Player)
//!         .with_resource(ResourceKind::Health, ResourcePool::full(1000.0)),
//! )?;
//! sim.add_unit(
//!     Unit::new(UnitId(2), "dummy", UnitKind::Enemy)
//!         .with_resource(ResourceKind::Health, ResourcePool::full(1_000_000.0)),
//! )?;
//! sim.set_actors(UnitId(1), UnitId(2))?;
//! sim.set_rotation(Box::new(
//!     PriorityRotation::new("basic").with_entry(SpellId(1), Condition::Always),
//! ));
//!
//! let report = sim.run()?;
//! assert!(report.status.is_completed());
//! assert_eq!(report.casts, 7);
//! # Ok::<(), combatsim_core::Error>(())
//! ```

pub mod aura;
mod config;
mod data;
mod error;
mod event;
mod handlers;
mod identity;
pub mod lifecycle;
mod queue;
mod registry;
mod report;
mod rng;
mod rotation;
mod sim;
mod state;
pub mod time;

#[cfg(test)]
mod testing;

pub use config::SimConfig;
pub use data::{
    AuraDefinition, Charges, EffectTarget, ItemDefinition, PeriodicEffect, PeriodicKind,
    RefreshMode, ResourceCost, SpellBook, SpellDefinition, SpellEffect, SpellTarget, StaticData,
};
pub use error::{Error, Result};
pub use event::{CastFailReason, CombatLogEvent, EventPayload, Subevent};
pub use handlers::{default_registry, register_defaults};
pub use identity::{EventId, ItemId, SpellId, UnitId};
pub use lifecycle::CastOutcome;
pub use queue::{EventQueue, PendingEvent};
pub use registry::{
    Criticality, DispatchReport, HandlerContext, HandlerFault, HandlerFn, HandlerRegistration,
    HandlerRegistry, Predicate,
};
pub use report::{EndReason, SimReport, SimStatus, SpellBreakdown};
pub use rng::{derive_seed, GameRng, RandomSource, SequenceRng};
pub use rotation::{
    Condition, Decision, PriorityEntry, PriorityRotation, Rotation, RotationCatalog,
    RotationContext, RotationDriver, RotationFactory, RotationTarget, ScriptedCast,
    ScriptedRotation, WaitFor,
};
pub use sim::{Encounter, Simulation};
pub use state::{
    Aura, CastAttempt, CastPhase, CombatState, CooldownState, Position, ResourceKind,
    ResourcePool, RunStats, Unit, UnitKind, UnitStats,
};
pub use time::{Clock, SimTime};
