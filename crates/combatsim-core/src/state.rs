//! Combat state store
//!
//! [`CombatState`] is the single root aggregate of a simulation: the clock,
//! every unit taking part and the run-scoped counters. It is owned by one
//! [`Simulation`](crate::Simulation) and handed to handlers by `&mut`, so
//! reads always observe the writes of earlier handlers.

use crate::{Clock, Error, EventId, ItemId, Result, SimTime, SpellId, UnitId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of resource pool a unit can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Health,
    Mana,
    Rage,
    Focus,
    Energy,
    ComboPoints,
    RunicPower,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Health => "health",
            ResourceKind::Mana => "mana",
            ResourceKind::Rage => "rage",
            ResourceKind::Focus => "focus",
            ResourceKind::Energy => "energy",
            ResourceKind::ComboPoints => "combo_points",
            ResourceKind::RunicPower => "runic_power",
        };
        f.write_str(s)
    }
}

/// A clamped resource pool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub current: f64,
    pub max: f64,
    /// Natural regeneration per second
    #[serde(default)]
    pub regen_per_sec: f64,
}

impl ResourcePool {
    /// A full pool without regeneration
    pub fn full(max: f64) -> Self {
        Self {
            current: max,
            max,
            regen_per_sec: 0.0,
        }
    }

    /// A pool with explicit current value (clamped to `[0, max]`)
    pub fn new(current: f64, max: f64) -> Self {
        Self {
            current: current.clamp(0.0, max.max(0.0)),
            max: max.max(0.0),
            regen_per_sec: 0.0,
        }
    }

    /// Builder: set regeneration per second
    pub fn with_regen(mut self, per_sec: f64) -> Self {
        self.regen_per_sec = per_sec;
        self
    }

    /// Add to the pool, returning the overflow that did not fit
    pub fn gain(&mut self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let room = self.max - self.current;
        if amount > room {
            self.current = self.max;
            amount - room
        } else {
            self.current += amount;
            0.0
        }
    }

    /// Remove from the pool, returning the amount actually removed
    pub fn spend(&mut self, amount: f64) -> f64 {
        let taken = amount.max(0.0).min(self.current);
        self.current -= taken;
        taken
    }

    /// Whether `amount` can be paid in full
    pub fn can_afford(&self, amount: f64) -> bool {
        self.current >= amount
    }

    /// Current value as a fraction of max (0 for an empty max)
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }

    /// Whether the pool is within `[0, max]`
    pub fn in_bounds(&self) -> bool {
        self.current.is_finite() && self.current >= 0.0 && self.current <= self.max
    }
}

/// Which side a unit fights on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Player,
    Pet,
    Enemy,
}

impl UnitKind {
    /// Whether two units are on opposing sides
    pub fn is_hostile_to(&self, other: UnitKind) -> bool {
        (*self == UnitKind::Enemy) != (other == UnitKind::Enemy)
    }
}

/// Combat stats used by damage, healing and timing formulas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitStats {
    pub attack_power: f64,
    pub spell_power: f64,
    /// Critical strike chance in percent
    pub crit_pct: f64,
    /// Haste in percent; shortens cast times, the GCD and hasted ticks
    pub haste_pct: f64,
}

impl UnitStats {
    /// Sum of two stat blocks
    pub fn plus(&self, other: &UnitStats) -> UnitStats {
        UnitStats {
            attack_power: self.attack_power + other.attack_power,
            spell_power: self.spell_power + other.spell_power,
            crit_pct: self.crit_pct + other.crit_pct,
            haste_pct: self.haste_pct + other.haste_pct,
        }
    }

    /// Every stat multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> UnitStats {
        UnitStats {
            attack_power: self.attack_power * factor,
            spell_power: self.spell_power * factor,
            crit_pct: self.crit_pct * factor,
            haste_pct: self.haste_pct * factor,
        }
    }
}

/// Position and facing on the encounter floor
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    /// Facing angle in radians, 0 = +x
    pub facing: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, facing: f64) -> Self {
        Self { x, y, facing }
    }

    /// Euclidean distance
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Whether `other` lies within the 180 degree cone in front of us
    pub fn is_facing(&self, other: &Position) -> bool {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0.0 && dy == 0.0 {
            return true;
        }
        let forward = (self.facing.cos(), self.facing.sin());
        dx * forward.0 + dy * forward.1 >= 0.0
    }
}

/// An aura currently active on a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aura {
    pub spell: SpellId,
    pub caster: UnitId,
    pub stacks: u8,
    pub max_stacks: u8,
    /// `SimTime::MAX` for auras without a duration
    pub expires_at: SimTime,
    pub applied_at: SimTime,
    /// Unique per application; ticks of a removed aura carry a dead instance
    pub instance: u64,
    /// When the next periodic tick is due, if one is scheduled
    pub next_tick_at: Option<SimTime>,
}

impl Aura {
    /// Whether the aura is logically expired at `now`
    pub fn is_expired(&self, now: SimTime) -> bool {
        self.expires_at <= now
    }

    /// Remaining duration at `now`
    pub fn remaining(&self, now: SimTime) -> SimTime {
        self.expires_at.saturating_sub(now)
    }
}

/// Cooldown and charge bookkeeping for one spell on one unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CooldownState {
    /// Flat cooldown: the spell is usable at or after this time
    pub ready_at: SimTime,
    /// Charges available (charge-based spells only)
    pub charges: u8,
    pub max_charges: u8,
    /// When the charge currently recovering comes back
    pub recharge_at: Option<SimTime>,
}

/// Lifecycle phase of a cast attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastPhase {
    Queued,
    Casting,
    Resolved,
    Interrupted,
    Failed,
}

/// A single attempt by a unit to cast a spell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastAttempt {
    pub serial: u64,
    pub spell: SpellId,
    pub target: UnitId,
    pub phase: CastPhase,
    pub started_at: SimTime,
    pub resolves_at: SimTime,
    /// The scheduled `SPELL_CAST_SUCCESS`
    pub pending: Option<EventId>,
    /// Cost paid when the cast began
    pub cost_paid: Option<(ResourceKind, f64)>,
}

/// A participant in the encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub kind: UnitKind,
    pub resources: IndexMap<ResourceKind, ResourcePool>,
    pub auras: IndexMap<SpellId, Aura>,
    pub cooldowns: IndexMap<SpellId, CooldownState>,
    pub gcd_ready_at: SimTime,
    /// The live cast attempt, if any
    pub cast: Option<CastAttempt>,
    /// Base stats including equipped items
    pub stats: UnitStats,
    pub items: Vec<ItemId>,
    pub position: Position,
    pub dead: bool,
}

impl Unit {
    /// Create a unit with no resources, auras or stats
    pub fn new(id: UnitId, name: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            resources: IndexMap::new(),
            auras: IndexMap::new(),
            cooldowns: IndexMap::new(),
            gcd_ready_at: 0,
            cast: None,
            stats: UnitStats::default(),
            items: Vec::new(),
            position: Position::default(),
            dead: false,
        }
    }

    /// Builder: add a resource pool
    pub fn with_resource(mut self, kind: ResourceKind, pool: ResourcePool) -> Self {
        self.resources.insert(kind, pool);
        self
    }

    /// Builder: set base stats
    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self
    }

    /// Builder: set position
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Builder: equip an item
    pub fn with_item(mut self, item: ItemId) -> Self {
        self.items.push(item);
        self
    }

    /// Current value of a resource (0 when the unit has no such pool)
    pub fn resource(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).map(|p| p.current).unwrap_or(0.0)
    }

    /// Current health
    pub fn health(&self) -> f64 {
        self.resource(ResourceKind::Health)
    }

    /// Whether the unit has a live cast
    pub fn is_casting(&self) -> bool {
        self.cast.is_some()
    }

    /// Stacks of an aura (0 when absent or expired)
    pub fn aura_stacks(&self, aura: SpellId, now: SimTime) -> u8 {
        self.auras
            .get(&aura)
            .filter(|a| !a.is_expired(now))
            .map(|a| a.stacks)
            .unwrap_or(0)
    }
}

/// Run-scoped counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_damage: f64,
    pub total_healing: f64,
    pub overhealing: f64,
    pub total_casts: u32,
    pub failed_casts: u32,
    pub casts_by_spell: IndexMap<SpellId, u32>,
    pub damage_by_spell: IndexMap<SpellId, f64>,
    pub resource_spent: IndexMap<ResourceKind, f64>,
    pub resource_gained: IndexMap<ResourceKind, f64>,
}

impl RunStats {
    pub fn record_cast(&mut self, spell: SpellId) {
        self.total_casts += 1;
        *self.casts_by_spell.entry(spell).or_insert(0) += 1;
    }

    pub fn record_damage(&mut self, spell: SpellId, amount: f64) {
        self.total_damage += amount;
        *self.damage_by_spell.entry(spell).or_insert(0.0) += amount;
    }

    pub fn record_spent(&mut self, kind: ResourceKind, amount: f64) {
        *self.resource_spent.entry(kind).or_insert(0.0) += amount;
    }

    pub fn record_gained(&mut self, kind: ResourceKind, amount: f64) {
        *self.resource_gained.entry(kind).or_insert(0.0) += amount;
    }
}

/// The root aggregate owned by one simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatState {
    pub clock: Clock,
    pub units: IndexMap<UnitId, Unit>,
    pub stats: RunStats,
    next_aura_instance: u64,
    next_cast_serial: u64,
}

impl CombatState {
    /// Create an empty state at t=0
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulation time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Add a unit, replacing any unit with the same id
    pub fn add_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Get a unit by id
    pub fn get_unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a unit mutably by id
    pub fn get_unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Get a unit, failing with `UnknownUnit`
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units.get(&id).ok_or(Error::UnknownUnit(id))
    }

    /// Get a unit mutably, failing with `UnknownUnit`
    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units.get_mut(&id).ok_or(Error::UnknownUnit(id))
    }

    /// Allocate a fresh aura instance number (never 0)
    pub fn next_aura_instance(&mut self) -> u64 {
        self.next_aura_instance += 1;
        self.next_aura_instance
    }

    /// Allocate a fresh cast serial (never 0)
    pub fn next_cast_serial(&mut self) -> u64 {
        self.next_cast_serial += 1;
        self.next_cast_serial
    }

    /// Drop every aura with `expires_at <= now`, returning what was pruned
    pub fn prune_expired(&mut self) -> Vec<(UnitId, Aura)> {
        let now = self.now();
        let mut pruned = Vec::new();
        for unit in self.units.values_mut() {
            let before = unit.auras.len();
            if before == 0 {
                continue;
            }
            let mut kept = IndexMap::with_capacity(before);
            for (id, aura) in unit.auras.drain(..) {
                if aura.is_expired(now) {
                    pruned.push((unit.id, aura));
                } else {
                    kept.insert(id, aura);
                }
            }
            unit.auras = kept;
        }
        pruned
    }

    /// Verify resource and aura-stack bounds on every unit
    pub fn check_invariants(&self) -> Result<()> {
        for unit in self.units.values() {
            for (kind, pool) in &unit.resources {
                if !pool.in_bounds() {
                    return Err(Error::InvariantViolation(format!(
                        "{} {} = {} outside [0, {}]",
                        unit.id, kind, pool.current, pool.max
                    )));
                }
            }
            for aura in unit.auras.values() {
                if aura.stacks == 0 || aura.stacks > aura.max_stacks {
                    return Err(Error::InvariantViolation(format!(
                        "{} aura {} has {} stacks (max {})",
                        unit.id, aura.spell, aura.stacks, aura.max_stacks
                    )));
                }
            }
        }
        Ok(())
    }
}
