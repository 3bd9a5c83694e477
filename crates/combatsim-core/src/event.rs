//! Combat log events
//!
//! A closed tagged union keyed by [`Subevent`]. Every event carries a common
//! base (timestamp, source, destination, spell) and a subevent-specific
//! payload. Events are stamped when scheduled and never change afterwards.

use crate::{ResourceKind, SimTime, SpellId, UnitId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator of a combat log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Subevent {
    SpellCastStart,
    SpellCastSuccess,
    SpellCastFailed,
    SpellDamage,
    SpellPeriodicDamage,
    SpellHeal,
    SpellPeriodicHeal,
    SpellEnergize,
    SpellPeriodicEnergize,
    SpellAuraApplied,
    SpellAuraAppliedDose,
    SpellAuraRefresh,
    SpellAuraRemoved,
    SpellAuraRemovedDose,
    SpellInterrupt,
    SpellCooldownReady,
    SpellChargeReady,
    UnitDied,
}

impl Subevent {
    /// All subevents, in declaration order
    pub const ALL: [Subevent; 18] = [
        Subevent::SpellCastStart,
        Subevent::SpellCastSuccess,
        Subevent::SpellCastFailed,
        Subevent::SpellDamage,
        Subevent::SpellPeriodicDamage,
        Subevent::SpellHeal,
        Subevent::SpellPeriodicHeal,
        Subevent::SpellEnergize,
        Subevent::SpellPeriodicEnergize,
        Subevent::SpellAuraApplied,
        Subevent::SpellAuraAppliedDose,
        Subevent::SpellAuraRefresh,
        Subevent::SpellAuraRemoved,
        Subevent::SpellAuraRemovedDose,
        Subevent::SpellInterrupt,
        Subevent::SpellCooldownReady,
        Subevent::SpellChargeReady,
        Subevent::UnitDied,
    ];

    /// The combat log name of this subevent
    pub fn as_str(&self) -> &'static str {
        match self {
            Subevent::SpellCastStart => "SPELL_CAST_START",
            Subevent::SpellCastSuccess => "SPELL_CAST_SUCCESS",
            Subevent::SpellCastFailed => "SPELL_CAST_FAILED",
            Subevent::SpellDamage => "SPELL_DAMAGE",
            Subevent::SpellPeriodicDamage => "SPELL_PERIODIC_DAMAGE",
            Subevent::SpellHeal => "SPELL_HEAL",
            Subevent::SpellPeriodicHeal => "SPELL_PERIODIC_HEAL",
            Subevent::SpellEnergize => "SPELL_ENERGIZE",
            Subevent::SpellPeriodicEnergize => "SPELL_PERIODIC_ENERGIZE",
            Subevent::SpellAuraApplied => "SPELL_AURA_APPLIED",
            Subevent::SpellAuraAppliedDose => "SPELL_AURA_APPLIED_DOSE",
            Subevent::SpellAuraRefresh => "SPELL_AURA_REFRESH",
            Subevent::SpellAuraRemoved => "SPELL_AURA_REMOVED",
            Subevent::SpellAuraRemovedDose => "SPELL_AURA_REMOVED_DOSE",
            Subevent::SpellInterrupt => "SPELL_INTERRUPT",
            Subevent::SpellCooldownReady => "SPELL_COOLDOWN_READY",
            Subevent::SpellChargeReady => "SPELL_CHARGE_READY",
            Subevent::UnitDied => "UNIT_DIED",
        }
    }

    /// Whether this is one of the periodic tick subevents
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            Subevent::SpellPeriodicDamage
                | Subevent::SpellPeriodicHeal
                | Subevent::SpellPeriodicEnergize
        )
    }
}

impl fmt::Display for Subevent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a cast attempt failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastFailReason {
    OnCooldown,
    InsufficientResource,
    OutOfRange,
    InvalidTarget,
    NoCharges,
    /// The global cooldown has not expired yet
    GcdActive,
    /// The caster already has a live cast
    AlreadyCasting,
    /// The target is outside the caster's facing cone
    NotFacing,
}

impl fmt::Display for CastFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CastFailReason::OnCooldown => "on cooldown",
            CastFailReason::InsufficientResource => "insufficient resource",
            CastFailReason::OutOfRange => "out of range",
            CastFailReason::InvalidTarget => "invalid target",
            CastFailReason::NoCharges => "no charges",
            CastFailReason::GcdActive => "global cooldown active",
            CastFailReason::AlreadyCasting => "already casting",
            CastFailReason::NotFacing => "not facing target",
        };
        f.write_str(s)
    }
}

/// Subevent-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    CastStart {
        cast_time: SimTime,
    },
    CastSuccess {
        /// Serial of the cast attempt this event resolves
        cast_serial: u64,
    },
    CastFailed {
        reason: CastFailReason,
    },
    Damage {
        amount: f64,
        critical: bool,
    },
    PeriodicDamage {
        amount: f64,
        critical: bool,
        /// Instance of the aura that produced the tick
        aura_instance: u64,
        tick_period: SimTime,
    },
    Heal {
        amount: f64,
        critical: bool,
    },
    PeriodicHeal {
        amount: f64,
        critical: bool,
        aura_instance: u64,
        tick_period: SimTime,
    },
    Energize {
        amount: f64,
        power: ResourceKind,
    },
    PeriodicEnergize {
        amount: f64,
        power: ResourceKind,
        /// 0 for natural regeneration
        aura_instance: u64,
        tick_period: SimTime,
    },
    AuraApplied {
        stacks: u8,
        expires_at: SimTime,
    },
    AuraAppliedDose {
        stacks: u8,
        expires_at: SimTime,
    },
    AuraRefresh {
        stacks: u8,
        expires_at: SimTime,
    },
    AuraRemoved,
    AuraRemovedDose {
        stacks: u8,
    },
    Interrupt {
        interrupted_spell: Option<SpellId>,
    },
    CooldownReady,
    ChargeReady,
    UnitDied,
}

impl EventPayload {
    /// The discriminator for this payload
    pub fn subevent(&self) -> Subevent {
        match self {
            EventPayload::CastStart { .. } => Subevent::SpellCastStart,
            EventPayload::CastSuccess { .. } => Subevent::SpellCastSuccess,
            EventPayload::CastFailed { .. } => Subevent::SpellCastFailed,
            EventPayload::Damage { .. } => Subevent::SpellDamage,
            EventPayload::PeriodicDamage { .. } => Subevent::SpellPeriodicDamage,
            EventPayload::Heal { .. } => Subevent::SpellHeal,
            EventPayload::PeriodicHeal { .. } => Subevent::SpellPeriodicHeal,
            EventPayload::Energize { .. } => Subevent::SpellEnergize,
            EventPayload::PeriodicEnergize { .. } => Subevent::SpellPeriodicEnergize,
            EventPayload::AuraApplied { .. } => Subevent::SpellAuraApplied,
            EventPayload::AuraAppliedDose { .. } => Subevent::SpellAuraAppliedDose,
            EventPayload::AuraRefresh { .. } => Subevent::SpellAuraRefresh,
            EventPayload::AuraRemoved => Subevent::SpellAuraRemoved,
            EventPayload::AuraRemovedDose { .. } => Subevent::SpellAuraRemovedDose,
            EventPayload::Interrupt { .. } => Subevent::SpellInterrupt,
            EventPayload::CooldownReady => Subevent::SpellCooldownReady,
            EventPayload::ChargeReady => Subevent::SpellChargeReady,
            EventPayload::UnitDied => Subevent::UnitDied,
        }
    }
}

/// An immutable, timestamped record of a discrete occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatLogEvent {
    /// Milliseconds from encounter start (set when scheduled)
    pub timestamp: SimTime,
    /// Unit that caused the event
    pub source: UnitId,
    /// Unit the event applies to
    pub dest: UnitId,
    /// Originating spell (or [`SpellId::NONE`])
    pub spell_id: SpellId,
    /// Subevent-specific fields
    pub payload: EventPayload,
}

impl CombatLogEvent {
    /// Create an unstamped event; the queue sets the timestamp on schedule
    pub fn new(source: UnitId, dest: UnitId, spell_id: SpellId, payload: EventPayload) -> Self {
        Self {
            timestamp: 0,
            source,
            dest,
            spell_id,
            payload,
        }
    }

    /// The discriminator of this event
    pub fn subevent(&self) -> Subevent {
        self.payload.subevent()
    }

    /// Damage or healing amount carried by this event, if any
    pub fn amount(&self) -> Option<f64> {
        match &self.payload {
            EventPayload::Damage { amount, .. }
            | EventPayload::PeriodicDamage { amount, .. }
            | EventPayload::Heal { amount, .. }
            | EventPayload::PeriodicHeal { amount, .. }
            | EventPayload::Energize { amount, .. }
            | EventPayload::PeriodicEnergize { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Whether this event is a critical hit or heal
    pub fn is_critical(&self) -> bool {
        matches!(
            &self.payload,
            EventPayload::Damage { critical: true, .. }
                | EventPayload::PeriodicDamage { critical: true, .. }
                | EventPayload::Heal { critical: true, .. }
                | EventPayload::PeriodicHeal { critical: true, .. }
        )
    }

    pub(crate) fn stamped(mut self, at: SimTime) -> Self {
        self.timestamp = at;
        self
    }
}

impl fmt::Display for CombatLogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>8}ms] {} {} -> {} {}",
            self.timestamp,
            self.subevent(),
            self.source,
            self.dest,
            self.spell_id
        )?;
        if let Some(amount) = self.amount() {
            write!(f, " {:.0}", amount)?;
            if self.is_critical() {
                f.write_str(" (crit)")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_subevent() {
        let event = CombatLogEvent::new(
            UnitId(1),
            UnitId(2),
            SpellId(100),
            EventPayload::Damage {
                amount: 50.0,
                critical: true,
            },
        );
        assert_eq!(event.subevent(), Subevent::SpellDamage);
        assert_eq!(event.amount(), Some(50.0));
        assert!(event.is_critical());
    }

    #[test]
    fn test_subevent_names() {
        assert_eq!(Subevent::SpellAuraAppliedDose.as_str(), "SPELL_AURA_APPLIED_DOSE");
        assert_eq!(Subevent::UnitDied.to_string(), "UNIT_DIED");
        assert!(Subevent::SpellPeriodicHeal.is_periodic());
        assert!(!Subevent::SpellHeal.is_periodic());
    }

    #[test]
    fn test_display() {
        let event = CombatLogEvent::new(
            UnitId(1),
            UnitId(2),
            SpellId(100),
            EventPayload::Damage {
                amount: 1234.4,
                critical: false,
            },
        )
        .stamped(1500);
        assert_eq!(
            event.to_string(),
            "[    1500ms] SPELL_DAMAGE unit:1 -> unit:2 spell:100 1234"
        );
    }
}
