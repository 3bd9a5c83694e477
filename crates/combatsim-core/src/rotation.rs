//! Rotation driver
//!
//! A rotation is the decision procedure that picks the acting unit's next
//! spell. It never blocks: [`Rotation::decide`] either returns a cast or a
//! [`WaitFor`] condition. The [`RotationDriver`] stores the pending wait and
//! only asks again once the condition holds on fully-settled state.
//!
//! Built-in rotations:
//! - [`PriorityRotation`] - data-driven priority list with conditions
//! - [`ScriptedRotation`] - fixed time-stamped cast list

use crate::lifecycle::{can_cast, ready_at};
use crate::{CombatState, ResourceKind, Result, SimTime, SpellId, StaticData, Unit, UnitId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Condition a suspended rotation waits for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WaitFor {
    /// The clock reaches the given time
    Time(SimTime),
    /// The acting unit has at least `amount` of `kind`
    Resource { kind: ResourceKind, amount: f64 },
    /// The GCD, cooldown and charges allow the spell
    SpellReady(SpellId),
    /// Any event is dispatched
    NextEvent,
}

/// What a rotation wants to do next
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    Cast { spell: SpellId, target: UnitId },
    Wait(WaitFor),
}

/// Read-only view handed to a rotation
pub struct RotationContext<'a> {
    pub state: &'a CombatState,
    pub data: &'a dyn StaticData,
    /// The unit the rotation plays
    pub actor: UnitId,
    /// The encounter's primary target
    pub target: UnitId,
}

impl<'a> RotationContext<'a> {
    pub fn now(&self) -> SimTime {
        self.state.now()
    }

    pub fn actor_unit(&self) -> Result<&'a Unit> {
        self.state.unit(self.actor)
    }

    pub fn target_unit(&self) -> Result<&'a Unit> {
        self.state.unit(self.target)
    }

    /// Current value of a resource on the actor
    pub fn resource(&self, kind: ResourceKind) -> Result<f64> {
        Ok(self.actor_unit()?.resource(kind))
    }

    /// Whether the actor can cast `spell` on `target` right now
    pub fn can_cast(&self, spell: SpellId, target: UnitId) -> Result<bool> {
        can_cast(self.state, self.data, self.actor, spell, target)
    }

    /// Earliest time the GCD, cooldown and charges allow `spell`
    pub fn ready_at(&self, spell: SpellId) -> Result<SimTime> {
        ready_at(self.state, self.data.spell(spell)?, self.actor)
    }

    /// Available charges (max charges when unused, 0 for non-charge spells)
    pub fn charges(&self, spell: SpellId) -> Result<u8> {
        let def = self.data.spell(spell)?;
        let Some(charges) = def.charges else {
            return Ok(0);
        };
        Ok(self
            .actor_unit()?
            .cooldowns
            .get(&spell)
            .map(|c| c.charges)
            .unwrap_or(charges.max))
    }

    /// Stacks of `aura` on `unit`
    pub fn aura_stacks(&self, unit: UnitId, aura: SpellId) -> Result<u8> {
        Ok(self.state.unit(unit)?.aura_stacks(aura, self.now()))
    }

    /// Remaining duration of `aura` on `unit` (0 when absent)
    pub fn aura_remaining(&self, unit: UnitId, aura: SpellId) -> Result<SimTime> {
        let now = self.now();
        Ok(self
            .state
            .unit(unit)?
            .auras
            .get(&aura)
            .map(|a| a.remaining(now))
            .unwrap_or(0))
    }
}

/// A pluggable decision procedure
pub trait Rotation: Send {
    fn name(&self) -> &str;

    /// Pick the next action; always a valid restart point
    fn decide(&mut self, ctx: &RotationContext<'_>) -> Result<Decision>;

    /// Forget any internal progress
    fn reset(&mut self) {}
}

/// Holds the single active rotation and its pending wait
#[derive(Default)]
pub struct RotationDriver {
    rotation: Option<Box<dyn Rotation>>,
    pending: Option<WaitFor>,
    saw_event: bool,
}

impl RotationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active rotation, clearing any pending wait
    pub fn set_rotation(&mut self, mut rotation: Box<dyn Rotation>) {
        rotation.reset();
        self.rotation = Some(rotation);
        self.pending = None;
        self.saw_event = false;
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation.is_some()
    }

    pub fn rotation_name(&self) -> Option<&str> {
        self.rotation.as_ref().map(|r| r.name())
    }

    /// The wait the rotation is suspended on
    pub fn pending(&self) -> Option<WaitFor> {
        self.pending
    }

    /// Record that an event was dispatched
    pub fn notify_event(&mut self) {
        self.saw_event = true;
    }

    /// Whether a wait condition holds
    pub fn is_satisfied(&self, wait: WaitFor, ctx: &RotationContext<'_>) -> Result<bool> {
        Ok(match wait {
            WaitFor::Time(t) => ctx.now() >= t,
            WaitFor::Resource { kind, amount } => ctx.resource(kind)? >= amount,
            WaitFor::SpellReady(spell) => ctx.ready_at(spell)? <= ctx.now(),
            WaitFor::NextEvent => self.saw_event,
        })
    }

    /// When a time-based wait will be satisfied
    pub fn wake_time(&self, ctx: &RotationContext<'_>) -> Result<Option<SimTime>> {
        Ok(match self.pending {
            Some(WaitFor::Time(t)) => Some(t),
            Some(WaitFor::SpellReady(spell)) => Some(ctx.ready_at(spell)?),
            _ => None,
        })
    }

    /// Ask the rotation for a decision if it is not suspended
    pub fn poll(&mut self, ctx: &RotationContext<'_>) -> Result<Option<Decision>> {
        if let Some(wait) = self.pending {
            if !self.is_satisfied(wait, ctx)? {
                return Ok(None);
            }
        }
        let Some(rotation) = self.rotation.as_mut() else {
            return Ok(None);
        };
        self.pending = None;

        let decision = rotation.decide(ctx)?;
        if let Decision::Wait(wait) = decision {
            self.pending = Some(wait);
            self.saw_event = false;
        }
        Ok(Some(decision))
    }
}

impl fmt::Debug for RotationDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationDriver")
            .field("rotation", &self.rotation_name())
            .field("pending", &self.pending)
            .finish()
    }
}

/// Which unit a priority entry refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationTarget {
    /// The encounter's primary target
    #[default]
    Target,
    /// The acting unit itself
    Actor,
}

impl RotationTarget {
    fn resolve(&self, ctx: &RotationContext<'_>) -> UnitId {
        match self {
            RotationTarget::Target => ctx.target,
            RotationTarget::Actor => ctx.actor,
        }
    }
}

/// Gate on a priority entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    #[default]
    Always,
    ResourceAtLeast {
        kind: ResourceKind,
        amount: f64,
    },
    ResourceBelow {
        kind: ResourceKind,
        amount: f64,
    },
    AuraMissing {
        aura: SpellId,
        #[serde(default)]
        on: RotationTarget,
    },
    AuraStacksBelow {
        aura: SpellId,
        stacks: u8,
        #[serde(default)]
        on: RotationTarget,
    },
    AuraRemainingBelow {
        aura: SpellId,
        ms: SimTime,
        #[serde(default)]
        on: RotationTarget,
    },
    ChargesAtLeast {
        spell: SpellId,
        charges: u8,
    },
    /// Target health fraction below the given percentage
    TargetHealthBelow(f64),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn evaluate(&self, ctx: &RotationContext<'_>) -> Result<bool> {
        Ok(match self {
            Condition::Always => true,
            Condition::ResourceAtLeast { kind, amount } => ctx.resource(*kind)? >= *amount,
            Condition::ResourceBelow { kind, amount } => ctx.resource(*kind)? < *amount,
            Condition::AuraMissing { aura, on } => ctx.aura_stacks(on.resolve(ctx), *aura)? == 0,
            Condition::AuraStacksBelow { aura, stacks, on } => {
                ctx.aura_stacks(on.resolve(ctx), *aura)? < *stacks
            }
            Condition::AuraRemainingBelow { aura, ms, on } => {
                ctx.aura_remaining(on.resolve(ctx), *aura)? < *ms
            }
            Condition::ChargesAtLeast { spell, charges } => ctx.charges(*spell)? >= *charges,
            Condition::TargetHealthBelow(pct) => {
                let health = ctx
                    .target_unit()?
                    .resources
                    .get(&ResourceKind::Health)
                    .map(|p| p.fraction() * 100.0)
                    .unwrap_or(100.0);
                health < *pct
            }
            Condition::All(conditions) => {
                for condition in conditions {
                    if !condition.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                true
            }
            Condition::Any(conditions) => {
                for condition in conditions {
                    if condition.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                false
            }
            Condition::Not(inner) => !inner.evaluate(ctx)?,
        })
    }
}

/// One line of a priority list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub spell: SpellId,
    #[serde(default)]
    pub target: RotationTarget,
    #[serde(default)]
    pub condition: Condition,
}

/// Casts the first usable entry whose condition holds
///
/// When nothing is castable it waits for the earliest readiness among the
/// entries whose condition holds, or for the next event when only resources
/// or conditions are blocking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRotation {
    pub name: String,
    pub entries: Vec<PriorityEntry>,
}

impl PriorityRotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Builder: append an entry
    pub fn with_entry(mut self, spell: SpellId, condition: Condition) -> Self {
        self.entries.push(PriorityEntry {
            spell,
            target: RotationTarget::Target,
            condition,
        });
        self
    }
}

impl Rotation for PriorityRotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&mut self, ctx: &RotationContext<'_>) -> Result<Decision> {
        let now = ctx.now();
        let mut wake: Option<SimTime> = None;

        for entry in &self.entries {
            if !entry.condition.evaluate(ctx)? {
                continue;
            }
            let target = entry.target.resolve(ctx);
            if ctx.can_cast(entry.spell, target)? {
                return Ok(Decision::Cast {
                    spell: entry.spell,
                    target,
                });
            }
            let ready = ctx.ready_at(entry.spell)?;
            if ready > now {
                wake = Some(wake.map_or(ready, |w| w.min(ready)));
            }
        }

        Ok(Decision::Wait(match wake {
            Some(t) => WaitFor::Time(t),
            None => WaitFor::NextEvent,
        }))
    }
}

/// A cast scheduled by a [`ScriptedRotation`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCast {
    pub at: SimTime,
    pub spell: SpellId,
    /// Defaults to the primary target
    #[serde(default)]
    pub target: Option<UnitId>,
}

/// Replays a fixed list of casts at given times
///
/// Each entry is attempted once; a failed attempt is not retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedRotation {
    pub name: String,
    pub casts: Vec<ScriptedCast>,
    #[serde(skip)]
    cursor: usize,
}

impl ScriptedRotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            casts: Vec::new(),
            cursor: 0,
        }
    }

    /// Builder: cast `spell` at the primary target at `at`
    pub fn cast_at(mut self, at: SimTime, spell: SpellId) -> Self {
        self.casts.push(ScriptedCast {
            at,
            spell,
            target: None,
        });
        self.casts.sort_by_key(|c| c.at);
        self
    }

    /// Casts not yet attempted
    pub fn remaining(&self) -> usize {
        self.casts.len().saturating_sub(self.cursor)
    }
}

impl Rotation for ScriptedRotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&mut self, ctx: &RotationContext<'_>) -> Result<Decision> {
        let Some(next) = self.casts.get(self.cursor) else {
            return Ok(Decision::Wait(WaitFor::Time(SimTime::MAX)));
        };
        if next.at > ctx.now() {
            return Ok(Decision::Wait(WaitFor::Time(next.at)));
        }
        self.cursor += 1;
        Ok(Decision::Cast {
            spell: next.spell,
            target: next.target.unwrap_or(ctx.target),
        })
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Builds a fresh rotation for an iteration id
pub type RotationFactory = Arc<dyn Fn(u64) -> Box<dyn Rotation> + Send + Sync>;

/// Rotation factories by identifier, shared read-only across workers
#[derive(Default, Clone)]
pub struct RotationCatalog {
    factories: IndexMap<String, RotationFactory>,
}

impl RotationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory; returns false if the name was already taken
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        F: Fn(u64) -> Box<dyn Rotation> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return false;
        }
        self.factories.insert(name, Arc::new(factory));
        true
    }

    /// Register a priority list under its own name
    pub fn register_priority(&mut self, rotation: PriorityRotation) -> bool {
        let name = rotation.name.clone();
        self.register(name, move |_| Box::new(rotation.clone()) as Box<dyn Rotation>)
    }

    /// Build the named rotation for iteration `sim_id`
    pub fn build(&self, name: &str, sim_id: u64) -> Option<Box<dyn Rotation>> {
        self.factories.get(name).map(|f| f(sim_id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for RotationCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
