//! Built-in combat handlers
//!
//! [`register_defaults`] installs the handlers every simulation needs:
//!
//! | subevent | priority | effect |
//! |---|---|---|
//! | `SPELL_CAST_SUCCESS` | 0 | resolve the cast |
//! | `SPELL_CAST_FAILED` | 100 | count failed casts |
//! | `SPELL_DAMAGE`, `SPELL_PERIODIC_DAMAGE` | 0 | subtract health, emit `UNIT_DIED` |
//! | `SPELL_HEAL`, `SPELL_PERIODIC_HEAL` | 0 | add health |
//! | `SPELL_ENERGIZE`, `SPELL_PERIODIC_ENERGIZE` | 0 | add resource |
//! | `SPELL_PERIODIC_*` | 50 | schedule the next tick |
//! | `SPELL_AURA_APPLIED`, `_DOSE`, `_REFRESH` | 0 | schedule the expiry and first tick |
//! | `SPELL_AURA_REMOVED` | 0 | delete an aura whose expiry has come |
//! | `SPELL_INTERRUPT` | 0 | interrupt the destination's cast |
//! | `SPELL_CHARGE_READY` | 0 | regain a charge |
//! | `UNIT_DIED` | 0 | stop the dead unit's cast and regeneration |

use crate::aura::{
    continue_regen, continue_ticks, install_aura, remove_aura, tick_instance,
};
use crate::lifecycle::{interrupt_cast, recover_charge, resolve_cast};
use crate::{
    CombatLogEvent, EventPayload, HandlerContext, HandlerRegistration, HandlerRegistry,
    ResourceKind, Result, SpellId, Subevent,
};
use tracing::debug;

/// Registry with every built-in handler installed
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    register_defaults(&mut registry);
    registry
}

/// Install the built-in handlers
pub fn register_defaults(registry: &mut HandlerRegistry) {
    registry.register(
        HandlerRegistration::new("cast.resolve", Subevent::SpellCastSuccess, |event, ctx| {
            resolve_cast(ctx, event)
        })
        .fatal(),
    );
    registry.register(
        HandlerRegistration::new("cast.count_failed", Subevent::SpellCastFailed, |_, ctx| {
            ctx.state.stats.failed_casts += 1;
            Ok(())
        })
        .with_priority(100),
    );

    for subevent in [Subevent::SpellDamage, Subevent::SpellPeriodicDamage] {
        registry.register(HandlerRegistration::new("damage.apply", subevent, apply_damage));
    }
    for subevent in [Subevent::SpellHeal, Subevent::SpellPeriodicHeal] {
        registry.register(HandlerRegistration::new("heal.apply", subevent, apply_heal));
    }
    for subevent in [Subevent::SpellEnergize, Subevent::SpellPeriodicEnergize] {
        registry.register(HandlerRegistration::new("energize.apply", subevent, apply_energize));
    }

    for subevent in [
        Subevent::SpellPeriodicDamage,
        Subevent::SpellPeriodicHeal,
        Subevent::SpellPeriodicEnergize,
    ] {
        registry.register(
            HandlerRegistration::new("periodic.reschedule", subevent, |event, ctx| {
                continue_ticks(ctx, event)
            })
            .with_priority(50)
            .with_predicate(|e| tick_instance(e).map(|i| i != 0).unwrap_or(false)),
        );
    }
    registry.register(
        HandlerRegistration::new(
            "regen.reschedule",
            Subevent::SpellPeriodicEnergize,
            |event, ctx| continue_regen(ctx, event),
        )
        .with_priority(50)
        .with_predicate(|e| e.spell_id == SpellId::NONE && tick_instance(e) == Some(0)),
    );

    for subevent in [
        Subevent::SpellAuraApplied,
        Subevent::SpellAuraAppliedDose,
        Subevent::SpellAuraRefresh,
    ] {
        registry.register(HandlerRegistration::new("aura.install", subevent, |event, ctx| {
            install_aura(ctx, event)
        }));
    }
    registry.register(HandlerRegistration::new(
        "aura.remove",
        Subevent::SpellAuraRemoved,
        |event, ctx| remove_aura(ctx, event),
    ));

    registry.register(HandlerRegistration::new(
        "cast.interrupt",
        Subevent::SpellInterrupt,
        |event, ctx| interrupt_cast(ctx, event.dest).map(|_| ()),
    ));
    registry.register(HandlerRegistration::new(
        "charges.recover",
        Subevent::SpellChargeReady,
        |event, ctx| recover_charge(ctx, event),
    ));
    registry.register(HandlerRegistration::new(
        "unit.died",
        Subevent::UnitDied,
        on_unit_died,
    ));
}

fn apply_damage(event: &CombatLogEvent, ctx: &mut HandlerContext<'_>) -> Result<()> {
    let Some(amount) = event.amount() else {
        return Ok(());
    };
    let unit = ctx.state.unit_mut(event.dest)?;
    if unit.dead {
        return Ok(());
    }

    let victim = unit.kind;

    let mut died = false;
    let mut dealt = 0.0;
    if let Some(health) = unit.resources.get_mut(&ResourceKind::Health) {
        dealt = health.spend(amount);
        if health.current <= 0.0 {
            unit.dead = true;
            died = true;
        }
    }
    // Only health actually removed from the other side counts toward DPS
    let hostile = ctx
        .state
        .get_unit(event.source)
        .map(|source| source.kind.is_hostile_to(victim))
        .unwrap_or(false);
    if hostile {
        ctx.state.stats.record_damage(event.spell_id, dealt);
    }

    if died {
        debug!(unit = %event.dest, killer = %event.source, at = event.timestamp, "Unit died");
        ctx.queue.emit(CombatLogEvent::new(
            event.source,
            event.dest,
            event.spell_id,
            EventPayload::UnitDied,
        ))?;
    }
    Ok(())
}

fn apply_heal(event: &CombatLogEvent, ctx: &mut HandlerContext<'_>) -> Result<()> {
    let Some(amount) = event.amount() else {
        return Ok(());
    };
    let unit = ctx.state.unit_mut(event.dest)?;
    if unit.dead {
        return Ok(());
    }
    let overflow = unit
        .resources
        .get_mut(&ResourceKind::Health)
        .map(|health| health.gain(amount))
        .unwrap_or(amount);

    ctx.state.stats.total_healing += amount - overflow;
    ctx.state.stats.overhealing += overflow;
    Ok(())
}

fn apply_energize(event: &CombatLogEvent, ctx: &mut HandlerContext<'_>) -> Result<()> {
    let (amount, power) = match event.payload {
        EventPayload::Energize { amount, power }
        | EventPayload::PeriodicEnergize { amount, power, .. } => (amount, power),
        _ => return Ok(()),
    };
    let unit = ctx.state.unit_mut(event.dest)?;
    if unit.dead {
        return Ok(());
    }
    let Some(pool) = unit.resources.get_mut(&power) else {
        return Ok(());
    };
    let overflow = pool.gain(amount);
    ctx.state.stats.record_gained(power, amount - overflow);
    Ok(())
}

fn on_unit_died(event: &CombatLogEvent, ctx: &mut HandlerContext<'_>) -> Result<()> {
    let unit = ctx.state.unit_mut(event.dest)?;
    unit.dead = true;
    let pending = unit.cast.take().and_then(|cast| cast.pending);
    if let Some(id) = pending {
        ctx.queue.cancel(id);
    }

    let dead = event.dest;
    ctx.queue.cancel_where(|e| {
        e.dest == dead && e.spell_id == SpellId::NONE && tick_instance(e) == Some(0)
    });
    Ok(())
}
