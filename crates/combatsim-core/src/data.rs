//! Static game data
//!
//! Spell, aura and item definitions are read-only for the whole run and
//! shared between worker threads. [`StaticData`] is the lookup seam;
//! [`SpellBook`] is the in-memory implementation used everywhere in this
//! workspace.

use crate::{Error, ItemId, ResourceKind, Result, SimTime, SpellId, UnitStats};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Who a spell may be cast on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellTarget {
    /// A unit hostile to the caster
    #[default]
    Enemy,
    /// A unit on the caster's side
    Friendly,
    /// Only the caster itself
    SelfOnly,
    /// Any living unit
    Any,
}

/// Which unit an effect lands on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTarget {
    #[default]
    Target,
    Caster,
}

/// Resource cost of a spell, paid when the cast begins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub kind: ResourceKind,
    pub amount: f64,
}

/// Charge configuration of a charge-based spell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Charges {
    pub max: u8,
    pub recovery_ms: SimTime,
}

/// One effect of a resolved spell, run in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpellEffect {
    /// Direct damage: `base + AP * ap_coefficient + SP * sp_coefficient`
    Damage {
        base: f64,
        #[serde(default)]
        ap_coefficient: f64,
        #[serde(default)]
        sp_coefficient: f64,
        /// Symmetric random spread, 0.1 = +/-10%
        #[serde(default)]
        variance: f64,
    },
    /// Direct healing, same scaling as damage
    Heal {
        base: f64,
        #[serde(default)]
        ap_coefficient: f64,
        #[serde(default)]
        sp_coefficient: f64,
        #[serde(default)]
        variance: f64,
        #[serde(default)]
        on: EffectTarget,
    },
    /// Restore a resource on the caster
    Energize { kind: ResourceKind, amount: f64 },
    /// Apply (or stack, or refresh) an aura
    ApplyAura {
        aura: SpellId,
        #[serde(default)]
        on: EffectTarget,
    },
    /// Apply an aura with probability `chance` (0.0..=1.0)
    Proc {
        chance: f64,
        aura: SpellId,
        #[serde(default)]
        on: EffectTarget,
    },
    /// Remove stacks of an aura from the caster
    ConsumeAura { aura: SpellId, stacks: u8 },
    /// Make a spell immediately available again
    ResetCooldown { spell: SpellId },
    /// Interrupt the target's live cast
    Interrupt,
}

/// A spell the lifecycle manager can cast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    pub id: SpellId,
    pub name: String,
    /// 0 for instant casts
    #[serde(default)]
    pub cast_time_ms: SimTime,
    /// Flat cooldown, started on resolution
    #[serde(default)]
    pub cooldown_ms: SimTime,
    #[serde(default)]
    pub charges: Option<Charges>,
    #[serde(default)]
    pub cost: Option<ResourceCost>,
    /// Maximum distance to the target; `None` for unlimited
    #[serde(default)]
    pub range: Option<f64>,
    #[serde(default)]
    pub requires_facing: bool,
    #[serde(default)]
    pub target: SpellTarget,
    #[serde(default = "default_true")]
    pub triggers_gcd: bool,
    /// Resolves without replacing (or being blocked by) the live cast
    #[serde(default)]
    pub usable_while_casting: bool,
    /// Return the paid cost when the cast is interrupted
    #[serde(default)]
    pub refund_on_interrupt: bool,
    /// Added to the caster's crit chance, in percent
    #[serde(default)]
    pub crit_bonus_pct: f64,
    #[serde(default)]
    pub effects: Vec<SpellEffect>,
}

fn default_true() -> bool {
    true
}

impl SpellDefinition {
    /// An instant, free, enemy-targeted spell with no effects
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cast_time_ms: 0,
            cooldown_ms: 0,
            charges: None,
            cost: None,
            range: None,
            requires_facing: false,
            target: SpellTarget::Enemy,
            triggers_gcd: true,
            usable_while_casting: false,
            refund_on_interrupt: false,
            crit_bonus_pct: 0.0,
            effects: Vec::new(),
        }
    }

    pub fn with_cast_time(mut self, ms: SimTime) -> Self {
        self.cast_time_ms = ms;
        self
    }

    pub fn with_cooldown(mut self, ms: SimTime) -> Self {
        self.cooldown_ms = ms;
        self
    }

    pub fn with_charges(mut self, max: u8, recovery_ms: SimTime) -> Self {
        self.charges = Some(Charges { max, recovery_ms });
        self
    }

    pub fn with_cost(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.cost = Some(ResourceCost { kind, amount });
        self
    }

    pub fn with_range(mut self, range: f64) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_target(mut self, target: SpellTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_crit_bonus(mut self, pct: f64) -> Self {
        self.crit_bonus_pct = pct;
        self
    }

    pub fn off_gcd(mut self) -> Self {
        self.triggers_gcd = false;
        self
    }

    pub fn with_effect(mut self, effect: SpellEffect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Shorthand for a flat damage effect
    pub fn with_damage(self, base: f64) -> Self {
        self.with_effect(SpellEffect::Damage {
            base,
            ap_coefficient: 0.0,
            sp_coefficient: 0.0,
            variance: 0.0,
        })
    }
}

/// How a repeated application of a capped aura changes its expiry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshMode {
    /// Reset to `now + duration`
    #[default]
    Duration,
    /// `now + duration + min(remaining, pandemic_ratio * duration)`
    Pandemic,
}

/// What a periodic aura does on each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PeriodicKind {
    Damage,
    Heal,
    Energize(ResourceKind),
}

/// Periodic tick configuration of an aura
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicEffect {
    pub kind: PeriodicKind,
    pub interval_ms: SimTime,
    /// Per stack, per tick
    pub amount: f64,
    #[serde(default)]
    pub ap_coefficient: f64,
    #[serde(default)]
    pub sp_coefficient: f64,
    /// Scale the interval by the caster's haste
    #[serde(default = "default_true")]
    pub hasted: bool,
    /// Tick once immediately on application
    #[serde(default)]
    pub tick_on_apply: bool,
}

/// A buff or debuff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraDefinition {
    pub id: SpellId,
    pub name: String,
    /// 0 for auras that last until removed
    #[serde(default)]
    pub duration_ms: SimTime,
    #[serde(default = "default_stacks")]
    pub max_stacks: u8,
    #[serde(default)]
    pub refresh: RefreshMode,
    #[serde(default)]
    pub periodic: Option<PeriodicEffect>,
    /// Stat bonus per stack while the aura is active
    #[serde(default)]
    pub stats: UnitStats,
}

fn default_stacks() -> u8 {
    1
}

impl AuraDefinition {
    pub fn new(id: SpellId, name: impl Into<String>, duration_ms: SimTime) -> Self {
        Self {
            id,
            name: name.into(),
            duration_ms,
            max_stacks: 1,
            refresh: RefreshMode::Duration,
            periodic: None,
            stats: UnitStats::default(),
        }
    }

    pub fn with_max_stacks(mut self, max_stacks: u8) -> Self {
        self.max_stacks = max_stacks.max(1);
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshMode) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_periodic(mut self, periodic: PeriodicEffect) -> Self {
        self.periodic = Some(periodic);
        self
    }

    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self
    }
}

/// An item granting flat stats to whoever has it equipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub stats: UnitStats,
}

/// Read-only lookup of static definitions by numeric id
pub trait StaticData: Send + Sync {
    fn get_spell(&self, id: SpellId) -> Option<&SpellDefinition>;

    fn get_aura(&self, id: SpellId) -> Option<&AuraDefinition>;

    fn get_item(&self, id: ItemId) -> Option<&ItemDefinition>;

    /// Look up a spell, failing with `UnknownSpell`
    fn spell(&self, id: SpellId) -> Result<&SpellDefinition> {
        self.get_spell(id).ok_or(Error::UnknownSpell(id))
    }

    /// Look up an aura, failing with `UnknownAura`
    fn aura(&self, id: SpellId) -> Result<&AuraDefinition> {
        self.get_aura(id).ok_or(Error::UnknownAura(id))
    }

    /// Look up an item, failing with `UnknownItem`
    fn item(&self, id: ItemId) -> Result<&ItemDefinition> {
        self.get_item(id).ok_or(Error::UnknownItem(id))
    }
}

/// In-memory static data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellBook {
    pub spells: IndexMap<SpellId, SpellDefinition>,
    pub auras: IndexMap<SpellId, AuraDefinition>,
    pub items: IndexMap<ItemId, ItemDefinition>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a spell, returning the definition it replaced
    pub fn insert_spell(&mut self, spell: SpellDefinition) -> Option<SpellDefinition> {
        self.spells.insert(spell.id, spell)
    }

    /// Insert an aura, returning the definition it replaced
    pub fn insert_aura(&mut self, aura: AuraDefinition) -> Option<AuraDefinition> {
        self.auras.insert(aura.id, aura)
    }

    /// Insert an item, returning the definition it replaced
    pub fn insert_item(&mut self, item: ItemDefinition) -> Option<ItemDefinition> {
        self.items.insert(item.id, item)
    }

    /// Builder: add a spell
    pub fn with_spell(mut self, spell: SpellDefinition) -> Self {
        self.insert_spell(spell);
        self
    }

    /// Builder: add an aura
    pub fn with_aura(mut self, aura: AuraDefinition) -> Self {
        self.insert_aura(aura);
        self
    }

    /// Builder: add an item
    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.insert_item(item);
        self
    }

    /// Merge another book into this one; later definitions win
    pub fn extend(&mut self, other: SpellBook) {
        self.spells.extend(other.spells);
        self.auras.extend(other.auras);
        self.items.extend(other.items);
    }
}

impl StaticData for SpellBook {
    fn get_spell(&self, id: SpellId) -> Option<&SpellDefinition> {
        self.spells.get(&id)
    }

    fn get_aura(&self, id: SpellId) -> Option<&AuraDefinition> {
        self.auras.get(&id)
    }

    fn get_item(&self, id: ItemId) -> Option<&ItemDefinition> {
        self.items.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let book = SpellBook::new()
            .with_spell(SpellDefinition::new(SpellId(1), "Strike").with_damage(100.0))
            .with_aura(AuraDefinition::new(SpellId(2), "Bleed", 6000));

        assert_eq!(book.spell(SpellId(1)).unwrap().name, "Strike");
        assert!(book.get_aura(SpellId(2)).is_some());
        assert_eq!(
            book.spell(SpellId(99)).unwrap_err(),
            Error::UnknownSpell(SpellId(99))
        );
        assert_eq!(
            book.item(ItemId(5)).unwrap_err(),
            Error::UnknownItem(ItemId(5))
        );
    }

    #[test]
    fn test_insert_reports_replacement() {
        let mut book = SpellBook::new();
        assert!(book.insert_spell(SpellDefinition::new(SpellId(1), "A")).is_none());
        let old = book.insert_spell(SpellDefinition::new(SpellId(1), "B"));
        assert_eq!(old.map(|s| s.name), Some("A".to_string()));
    }

    #[test]
    fn test_ron_defaults() {
        let spell: SpellDefinition = ron::from_str(
            r#"(
                id: 100,
                name: "Fireball",
                cast_time_ms: 2500,
                effects: [Damage(base: 500.0, sp_coefficient: 1.2)],
            )"#,
        )
        .unwrap();
        assert!(spell.triggers_gcd);
        assert_eq!(spell.target, SpellTarget::Enemy);
        assert_eq!(spell.effects.len(), 1);

        let aura: AuraDefinition = ron::from_str(r#"(id: 7, name: "Rage", max_stacks: 3)"#).unwrap();
        assert_eq!(aura.duration_ms, 0);
        assert_eq!(aura.max_stacks, 3);
        assert_eq!(aura.refresh, RefreshMode::Duration);
    }
}
