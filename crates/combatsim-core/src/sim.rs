//! Sim driver
//!
//! Owns one simulation instance end to end: the combat state, the event
//! queue, the random source and the rotation driver. The loop is
//!
//! 1. advance the clock to the earliest of the next due event, `now +
//!    tick_ms`, the rotation's wake time, or the encounter end;
//! 2. drain due events in micro-passes, dispatching each one and appending it
//!    to the log (events emitted at `now` run in the next micro-pass);
//! 3. if the acting unit is free, ask the rotation driver and route a cast
//!    into the lifecycle manager;
//! 4. stop when the encounter ends, the primary target dies, or a fatal
//!    error aborts the run.

use crate::aura::schedule_regen;
use crate::lifecycle::{begin_cast, CastOutcome};
use crate::{
    CombatLogEvent, CombatState, Decision, EndReason, Error, EventQueue, GameRng,
    HandlerContext, HandlerFault, HandlerRegistry, RandomSource, Result, Rotation,
    RotationContext, RotationDriver, SimConfig, SimReport, SimStatus, SimTime, SpellBreakdown,
    SpellId, StaticData, Unit, UnitId,
};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Units and roles of an encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub units: Vec<Unit>,
    /// The unit driven by the rotation
    pub player: UnitId,
    /// The primary target; its death ends the run
    pub target: UnitId,
}

/// A single simulation instance
pub struct Simulation {
    config: SimConfig,
    data: Arc<dyn StaticData>,
    registry: Arc<HandlerRegistry>,
    rng: Box<dyn RandomSource + Send>,
    state: CombatState,
    queue: EventQueue,
    driver: RotationDriver,
    player: Option<UnitId>,
    target: Option<UnitId>,
    status: SimStatus,
    log: Vec<CombatLogEvent>,
    faults: Vec<HandlerFault>,
    error: Option<Error>,
    /// A failed or suspended decision blocks the rotation until the clock moves
    decision_blocked_at: Option<SimTime>,
    /// Clock value and queue sequence at which cascade counting started
    cascade_at: Option<SimTime>,
    cascade_mark: u64,
    cascaded: usize,
}

impl Simulation {
    /// Create an empty simulation seeded from `config.seed`
    pub fn new(
        config: SimConfig,
        data: Arc<dyn StaticData>,
        registry: Arc<HandlerRegistry>,
    ) -> Self {
        let rng = Box::new(GameRng::new(config.seed));
        Self {
            config,
            data,
            registry,
            rng,
            state: CombatState::new(),
            queue: EventQueue::new(),
            driver: RotationDriver::new(),
            player: None,
            target: None,
            status: SimStatus::Idle,
            log: Vec::new(),
            faults: Vec::new(),
            error: None,
            decision_blocked_at: None,
            cascade_at: None,
            cascade_mark: 0,
            cascaded: 0,
        }
    }

    /// Create a simulation populated from an encounter
    pub fn from_encounter(
        encounter: &Encounter,
        config: SimConfig,
        data: Arc<dyn StaticData>,
        registry: Arc<HandlerRegistry>,
    ) -> Result<Self> {
        let mut sim = Self::new(config, data, registry);
        for unit in &encounter.units {
            sim.add_unit(unit.clone())?;
        }
        sim.set_actors(encounter.player, encounter.target)?;
        Ok(sim)
    }

    /// Builder: replace the random source
    pub fn with_rng(mut self, rng: Box<dyn RandomSource + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Add a unit, folding the stats of its equipped items into its base stats
    pub fn add_unit(&mut self, mut unit: Unit) -> Result<()> {
        for item in &unit.items {
            let def = self.data.item(*item)?;
            unit.stats = unit.stats.plus(&def.stats);
        }
        self.state.add_unit(unit);
        Ok(())
    }

    /// Set the rotation-driven unit and the primary target
    pub fn set_actors(&mut self, player: UnitId, target: UnitId) -> Result<()> {
        self.state.unit(player)?;
        self.state.unit(target)?;
        self.player = Some(player);
        self.target = Some(target);
        Ok(())
    }

    /// Replace the active rotation
    pub fn set_rotation(&mut self, rotation: Box<dyn Rotation>) {
        debug!(rotation = rotation.name(), "Rotation set");
        self.driver.set_rotation(rotation);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn now(&self) -> SimTime {
        self.state.now()
    }

    pub fn status(&self) -> &SimStatus {
        &self.status
    }

    /// Events dispatched so far, in order
    pub fn log(&self) -> &[CombatLogEvent] {
        &self.log
    }

    pub fn faults(&self) -> &[HandlerFault] {
        &self.faults
    }

    /// The fatal error that aborted the run
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Number of live pending events
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Have `caster` attempt `spell` on `target` now, then settle
    pub fn cast(&mut self, caster: UnitId, spell: SpellId, target: UnitId) -> Result<CastOutcome> {
        self.ensure_running()?;
        let result = self.cast_now(caster, spell, target);
        self.guard(result)
    }

    /// Process everything up to and including `t`
    ///
    /// Stops early when the run completes or aborts.
    pub fn advance_to(&mut self, t: SimTime) -> Result<()> {
        self.ensure_running()?;
        let result = self.pump(t.min(self.config.duration_ms));
        self.guard(result)
    }

    /// One iteration of the driver loop
    pub fn step(&mut self) -> Result<SimStatus> {
        self.ensure_running()?;
        let limit = self.config.duration_ms;
        let result = self.iterate(limit).map(|_| ());
        self.guard(result)?;
        Ok(self.status.clone())
    }

    /// Run the encounter to completion and produce the report
    ///
    /// A fatal error during the run yields an `Aborted` report rather than an
    /// `Err`; `Err` is reserved for misuse (no rotation, already finished).
    pub fn run(&mut self) -> Result<SimReport> {
        if !self.driver.has_rotation() {
            return Err(Error::NoRotation);
        }
        self.ensure_running()?;
        let limit = self.config.duration_ms;
        let result = self.pump(limit);
        // The error is already captured in the status
        let _ = self.guard(result);
        Ok(self.report())
    }

    /// Snapshot the report for the current state
    pub fn report(&self) -> SimReport {
        let stats = &self.state.stats;
        let duration_ms = self.now();
        let ids: IndexSet<SpellId> = stats
            .casts_by_spell
            .keys()
            .chain(stats.damage_by_spell.keys())
            .copied()
            .collect();
        let spells = ids
            .into_iter()
            .map(|id| SpellBreakdown {
                spell: id,
                name: self
                    .data
                    .get_spell(id)
                    .map(|s| s.name.clone())
                    .or_else(|| self.data.get_aura(id).map(|a| a.name.clone()))
                    .unwrap_or_else(|| id.to_string()),
                casts: stats.casts_by_spell.get(&id).copied().unwrap_or(0),
                damage: stats.damage_by_spell.get(&id).copied().unwrap_or(0.0),
            })
            .collect();

        SimReport {
            status: self.status.clone(),
            duration_ms,
            total_damage: stats.total_damage,
            total_healing: stats.total_healing,
            dps: SimReport::compute_dps(stats.total_damage, duration_ms),
            casts: stats.total_casts,
            failed_casts: stats.failed_casts,
            spells,
            resource_spent: stats.resource_spent.clone(),
            degraded: !self.faults.is_empty(),
            faults: self.faults.clone(),
            error: self.error.as_ref().map(|e| e.to_string()),
            log: self.log.clone(),
        }
    }

    fn ensure_running(&mut self) -> Result<()> {
        match self.status {
            SimStatus::Idle => self.start(),
            SimStatus::Running => Ok(()),
            _ => Err(Error::AlreadyFinished),
        }
    }

    fn start(&mut self) -> Result<()> {
        self.status = SimStatus::Running;
        let first_tick = self.now() + self.config.regen_tick_ms.max(1);
        let regen: Vec<_> = self
            .state
            .units
            .values()
            .flat_map(|unit| {
                unit.resources
                    .iter()
                    .filter(|(_, pool)| pool.regen_per_sec > 0.0)
                    .map(move |(kind, _)| (unit.id, *kind))
            })
            .collect();
        for (unit, kind) in regen {
            self.with_ctx(|ctx| schedule_regen(ctx, unit, kind, first_tick))?;
        }
        debug!(units = self.state.units.len(), "Simulation started");
        Ok(())
    }

    fn with_ctx<R>(&mut self, f: impl FnOnce(&mut HandlerContext<'_>) -> R) -> R {
        let mut ctx = HandlerContext {
            state: &mut self.state,
            queue: &mut self.queue,
            rng: &mut *self.rng,
            data: &*self.data,
            config: &self.config,
        };
        f(&mut ctx)
    }

    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if !self.status.is_finished() {
                error!(at = self.now(), error = %err, "Simulation aborted");
                self.status = SimStatus::Aborted(err.to_string());
                self.error = Some(err.clone());
            }
        }
        result
    }

    fn cast_now(&mut self, caster: UnitId, spell: SpellId, target: UnitId) -> Result<CastOutcome> {
        self.settle()?;
        let outcome = self.with_ctx(|ctx| begin_cast(ctx, caster, spell, target))?;
        self.settle()?;
        Ok(outcome)
    }

    fn pump(&mut self, limit: SimTime) -> Result<()> {
        while self.iterate(limit)? {}
        Ok(())
    }

    /// Returns false once there is nothing left to do before `limit`
    fn iterate(&mut self, limit: SimTime) -> Result<bool> {
        self.settle()?;
        if self.check_end() {
            return Ok(false);
        }
        if self.act()? {
            return Ok(true);
        }
        let now = self.now();
        if now >= limit {
            return Ok(false);
        }
        let next = self.next_wake()?.min(limit);
        self.advance_clock(next);
        Ok(true)
    }

    /// Dispatch every event due at the current time
    fn settle(&mut self) -> Result<()> {
        let now = self.now();
        if self.cascade_at != Some(now) {
            self.cascade_at = Some(now);
            self.cascade_mark = self.queue.next_seq();
            self.cascaded = 0;
        }

        let registry = Arc::clone(&self.registry);
        let limit = self.config.max_cascade_per_tick;
        while let Some(pending) = self.queue.pop_due(now) {
            if pending.seq >= self.cascade_mark {
                self.cascaded += 1;
                if self.cascaded > limit {
                    return Err(Error::EventStorm { at: now, limit });
                }
            }

            self.state.prune_expired();
            let report = self.with_ctx(|ctx| registry.dispatch(&pending.event, ctx))?;
            self.faults.extend(report.faults);
            self.driver.notify_event();
            if self.config.record_log {
                self.log.push(pending.event);
            }
        }
        self.state.prune_expired();
        self.state.check_invariants()
    }

    fn check_end(&mut self) -> bool {
        let target_dead = self
            .target
            .and_then(|t| self.state.get_unit(t))
            .map(|u| u.dead)
            .unwrap_or(false);
        let reason = if target_dead {
            EndReason::TargetDied
        } else if self.now() >= self.config.duration_ms {
            EndReason::DurationElapsed
        } else {
            return false;
        };
        debug!(at = self.now(), ?reason, "Simulation completed");
        self.status = SimStatus::Completed(reason);
        true
    }

    /// Consult the rotation; returns true when something was routed into the
    /// lifecycle and the current time needs settling again
    fn act(&mut self) -> Result<bool> {
        let (Some(player), Some(target)) = (self.player, self.target) else {
            return Ok(false);
        };
        let now = self.now();
        if !self.driver.has_rotation() || self.decision_blocked_at == Some(now) {
            return Ok(false);
        }
        let unit = self.state.unit(player)?;
        if unit.dead || unit.is_casting() || now < unit.gcd_ready_at {
            return Ok(false);
        }

        let ctx = RotationContext {
            state: &self.state,
            data: &*self.data,
            actor: player,
            target,
        };
        let Some(decision) = self.driver.poll(&ctx)? else {
            return Ok(false);
        };

        match decision {
            Decision::Cast { spell, target } => {
                let outcome = self.with_ctx(|ctx| begin_cast(ctx, player, spell, target))?;
                if let CastOutcome::Failed(_) = outcome {
                    self.decision_blocked_at = Some(now);
                }
                Ok(true)
            }
            Decision::Wait(_) => {
                self.decision_blocked_at = Some(now);
                Ok(false)
            }
        }
    }

    /// Earliest time the loop has something to do
    fn next_wake(&mut self) -> Result<SimTime> {
        let now = self.now();
        let mut next = now + self.config.tick_ms.max(1);
        if let Some(due) = self.queue.next_due() {
            next = next.min(due);
        }
        if let (Some(player), Some(target)) = (self.player, self.target) {
            let ctx = RotationContext {
                state: &self.state,
                data: &*self.data,
                actor: player,
                target,
            };
            if let Some(wake) = self.driver.wake_time(&ctx)? {
                if wake > now {
                    next = next.min(wake);
                }
            }
        }
        Ok(next.max(now + 1))
    }

    fn advance_clock(&mut self, t: SimTime) {
        if self.state.clock.advance_to(t) {
            self.queue.advance_to(t);
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.now())
            .field("status", &self.status)
            .field("units", &self.state.units.len())
            .field("pending", &self.queue.len())
            .field("driver", &self.driver)
            .finish()
    }
}
