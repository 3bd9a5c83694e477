//! Aura application, stacking and periodic ticks
//!
//! [`apply_aura`] and [`consume_aura`] change the holder's auras on the spot
//! and emit the subevent recording what happened (`SPELL_AURA_APPLIED`,
//! `_APPLIED_DOSE`, `_REFRESH`, `_REMOVED_DOSE` or `_REMOVED`). The handlers
//! registered for the application subevents ([`install_aura`]) then schedule
//! the expiry and start the ticks from the live aura.
//!
//! Periodic effects are self-rescheduling: each tick event is rolled when it
//! is scheduled, and the tick handler schedules the next one while the aura
//! instance that produced it is still alive.

use crate::lifecycle::scaled_amount;
use crate::time::hasted;
use crate::{
    Aura, AuraDefinition, CombatLogEvent, CombatState, EventPayload, HandlerContext,
    PeriodicEffect, PeriodicKind, RefreshMode, ResourceKind, Result, SimTime, SpellId,
    StaticData, Subevent, UnitId, UnitStats,
};
use tracing::debug;

/// Base stats plus the per-stack bonuses of every active aura
pub fn effective_stats(state: &CombatState, data: &dyn StaticData, unit: UnitId) -> Result<UnitStats> {
    let now = state.now();
    let unit = state.unit(unit)?;
    let mut stats = unit.stats;
    for aura in unit.auras.values().filter(|a| !a.is_expired(now)) {
        let def = data.aura(aura.spell)?;
        stats = stats.plus(&def.stats.scaled(aura.stacks as f64));
    }
    Ok(stats)
}

/// New expiry for an application at `now`
pub fn refreshed_expiry(
    def: &AuraDefinition,
    existing: Option<&Aura>,
    now: SimTime,
    pandemic_ratio: f64,
) -> SimTime {
    if def.duration_ms == 0 {
        return SimTime::MAX;
    }
    let base = now + def.duration_ms;
    match (def.refresh, existing) {
        (RefreshMode::Pandemic, Some(aura)) => {
            let cap = (def.duration_ms as f64 * pandemic_ratio) as SimTime;
            base + aura.remaining(now).min(cap)
        }
        _ => base,
    }
}

/// Apply `aura` from `caster` to `target` and emit the matching subevent
///
/// The aura is written immediately, so a second application in the same pass
/// sees the first one and stacks on it.
pub fn apply_aura(
    ctx: &mut HandlerContext<'_>,
    caster: UnitId,
    target: UnitId,
    aura: SpellId,
) -> Result<()> {
    let data = ctx.data;
    let def = data.aura(aura)?;
    let now = ctx.now();
    let pandemic_ratio = ctx.config.pandemic_ratio;
    let fresh_instance = ctx.state.next_aura_instance();
    let holder = ctx.state.unit_mut(target)?;
    if holder.dead {
        return Ok(());
    }

    let payload = match holder.auras.get_mut(&aura).filter(|a| !a.is_expired(now)) {
        Some(current) => {
            let expires_at = refreshed_expiry(def, Some(&*current), now, pandemic_ratio);
            current.expires_at = expires_at;
            current.caster = caster;
            if current.stacks < def.max_stacks {
                current.stacks += 1;
                EventPayload::AuraAppliedDose {
                    stacks: current.stacks,
                    expires_at,
                }
            } else {
                EventPayload::AuraRefresh {
                    stacks: current.stacks,
                    expires_at,
                }
            }
        }
        None => {
            let expires_at = refreshed_expiry(def, None, now, pandemic_ratio);
            holder.auras.insert(
                aura,
                Aura {
                    spell: aura,
                    caster,
                    stacks: 1,
                    max_stacks: def.max_stacks.max(1),
                    expires_at,
                    applied_at: now,
                    instance: fresh_instance,
                    next_tick_at: None,
                },
            );
            EventPayload::AuraApplied {
                stacks: 1,
                expires_at,
            }
        }
    };

    ctx.queue
        .emit(CombatLogEvent::new(caster, target, aura, payload))?;
    Ok(())
}

/// Remove `stacks` stacks of `aura` from `unit`
///
/// Emits `SPELL_AURA_REMOVED_DOSE` when stacks remain, otherwise
/// `SPELL_AURA_REMOVED`. Does nothing when the aura is absent. Like
/// [`apply_aura`] the state changes immediately; a full removal also drops
/// the pending expiry and ticks.
pub fn consume_aura(ctx: &mut HandlerContext<'_>, unit: UnitId, aura: SpellId, stacks: u8) -> Result<()> {
    let now = ctx.now();
    let holder = ctx.state.unit_mut(unit)?;
    let Some(current) = holder.auras.get_mut(&aura).filter(|a| !a.is_expired(now)) else {
        return Ok(());
    };

    let caster = current.caster;
    let remaining = current.stacks.saturating_sub(stacks.max(1));
    let payload = if remaining > 0 {
        current.stacks = remaining;
        EventPayload::AuraRemovedDose { stacks: remaining }
    } else {
        if let Some(removed) = holder.auras.shift_remove(&aura) {
            cancel_pending(ctx, unit, &removed);
        }
        EventPayload::AuraRemoved
    };
    ctx.queue
        .emit(CombatLogEvent::new(caster, unit, aura, payload))?;
    Ok(())
}

/// Schedule the expiry and first tick of the aura behind an applied / dose /
/// refresh event
///
/// Reads the live aura rather than the event, which only records what the
/// application did. Any pending removal is replaced by one at the current
/// expiry.
pub fn install_aura(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let data = ctx.data;
    let def = data.aura(event.spell_id)?;
    let now = ctx.now();
    let (holder, spell) = (event.dest, event.spell_id);

    let unit = ctx.state.unit(holder)?;
    if unit.dead {
        return Ok(());
    }
    let Some(aura) = unit.auras.get(&spell).filter(|a| !a.is_expired(now)) else {
        return Ok(());
    };
    let (caster, stacks, expires_at) = (aura.caster, aura.stacks, aura.expires_at);
    let needs_tick = aura.next_tick_at.is_none();

    ctx.queue.cancel_where(|e| {
        e.subevent() == Subevent::SpellAuraRemoved
            && e.dest == holder
            && e.spell_id == spell
            && e.timestamp > now
    });
    if expires_at != SimTime::MAX {
        ctx.queue.schedule(
            CombatLogEvent::new(caster, holder, spell, EventPayload::AuraRemoved),
            expires_at,
        )?;
    }

    if let (Some(periodic), true) = (def.periodic, needs_tick) {
        let first = if periodic.tick_on_apply && event.subevent() == Subevent::SpellAuraApplied {
            now
        } else {
            let caster_stats = effective_stats(ctx.state, data, caster)?;
            now + tick_interval(&periodic, &caster_stats)
        };
        if first <= expires_at {
            schedule_tick(ctx, holder, spell, first)?;
        }
    }

    debug!(unit = %holder, aura = %spell, stacks, expires_at, "Aura installed");
    Ok(())
}

/// Delete an aura when its scheduled `SPELL_AURA_REMOVED` fires
///
/// Removals recorded by [`consume_aura`] find the aura already gone. An aura
/// re-applied since then has a later expiry and is left alone.
pub fn remove_aura(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let now = ctx.now();
    let unit = ctx.state.unit_mut(event.dest)?;
    let expired = unit
        .auras
        .get(&event.spell_id)
        .map(|a| a.is_expired(now))
        .unwrap_or(false);
    if !expired {
        return Ok(());
    }
    if let Some(aura) = unit.auras.shift_remove(&event.spell_id) {
        cancel_pending(ctx, event.dest, &aura);
        debug!(unit = %event.dest, aura = %event.spell_id, "Aura removed");
    }
    Ok(())
}

/// Cancel the future ticks and expiry of a removed aura instance
fn cancel_pending(ctx: &mut HandlerContext<'_>, holder: UnitId, aura: &Aura) {
    let now = ctx.now();
    let (instance, spell) = (aura.instance, aura.spell);
    ctx.queue.cancel_where(|e| {
        e.timestamp > now
            && (tick_instance(e) == Some(instance)
                || (e.subevent() == Subevent::SpellAuraRemoved
                    && e.dest == holder
                    && e.spell_id == spell))
    });
}

/// Instance of the aura that produced a periodic tick (0 for regeneration)
pub fn tick_instance(event: &CombatLogEvent) -> Option<u64> {
    match event.payload {
        EventPayload::PeriodicDamage { aura_instance, .. }
        | EventPayload::PeriodicHeal { aura_instance, .. }
        | EventPayload::PeriodicEnergize { aura_instance, .. } => Some(aura_instance),
        _ => None,
    }
}

/// Tick interval for a caster with the given stats
pub fn tick_interval(periodic: &PeriodicEffect, caster: &UnitStats) -> SimTime {
    let interval = if periodic.hasted {
        hasted(periodic.interval_ms, caster.haste_pct)
    } else {
        periodic.interval_ms
    };
    interval.max(1)
}

/// Roll and schedule the next tick of `aura` on `holder` at `due`
pub fn schedule_tick(
    ctx: &mut HandlerContext<'_>,
    holder: UnitId,
    aura: SpellId,
    due: SimTime,
) -> Result<()> {
    let data = ctx.data;
    let def = data.aura(aura)?;
    let Some(periodic) = def.periodic else {
        return Ok(());
    };
    let Some(current) = ctx.state.unit(holder)?.auras.get(&aura).cloned() else {
        return Ok(());
    };

    let stats = effective_stats(ctx.state, data, current.caster)?;
    let tick_period = tick_interval(&periodic, &stats);
    let base = scaled_amount(
        periodic.amount,
        periodic.ap_coefficient,
        periodic.sp_coefficient,
        &stats,
    ) * current.stacks as f64;
    let aura_instance = current.instance;

    let payload = match periodic.kind {
        PeriodicKind::Damage | PeriodicKind::Heal => {
            let critical = ctx.rng.next_float() * 100.0 < stats.crit_pct;
            let amount = if critical {
                base * ctx.config.crit_multiplier
            } else {
                base
            };
            if periodic.kind == PeriodicKind::Damage {
                EventPayload::PeriodicDamage {
                    amount,
                    critical,
                    aura_instance,
                    tick_period,
                }
            } else {
                EventPayload::PeriodicHeal {
                    amount,
                    critical,
                    aura_instance,
                    tick_period,
                }
            }
        }
        PeriodicKind::Energize(power) => EventPayload::PeriodicEnergize {
            amount: base,
            power,
            aura_instance,
            tick_period,
        },
    };

    ctx.queue
        .schedule(CombatLogEvent::new(current.caster, holder, aura, payload), due)?;
    if let Some(live) = ctx.state.unit_mut(holder)?.auras.get_mut(&aura) {
        live.next_tick_at = Some(due);
    }
    Ok(())
}

/// Schedule the tick after `event` while its aura instance is alive
pub fn continue_ticks(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let Some(instance) = tick_instance(event).filter(|i| *i != 0) else {
        return Ok(());
    };
    let data = ctx.data;
    let def = data.aura(event.spell_id)?;
    let Some(periodic) = def.periodic else {
        return Ok(());
    };
    let now = ctx.now();

    let live = ctx
        .state
        .unit(event.dest)?
        .auras
        .get(&event.spell_id)
        .filter(|a| a.instance == instance && !a.is_expired(now))
        .map(|a| (a.caster, a.expires_at));
    let Some((caster, expires_at)) = live else {
        return Ok(());
    };

    let stats = effective_stats(ctx.state, data, caster)?;
    let next = now + tick_interval(&periodic, &stats);
    if next <= expires_at {
        schedule_tick(ctx, event.dest, event.spell_id, next)
    } else {
        if let Some(aura) = ctx.state.unit_mut(event.dest)?.auras.get_mut(&event.spell_id) {
            aura.next_tick_at = None;
        }
        Ok(())
    }
}

/// Schedule a natural regeneration tick of `kind` for `unit`
pub fn schedule_regen(
    ctx: &mut HandlerContext<'_>,
    unit: UnitId,
    kind: ResourceKind,
    due: SimTime,
) -> Result<()> {
    let interval = ctx.config.regen_tick_ms.max(1);
    let per_sec = ctx
        .state
        .unit(unit)?
        .resources
        .get(&kind)
        .map(|p| p.regen_per_sec)
        .unwrap_or(0.0);
    if per_sec <= 0.0 {
        return Ok(());
    }
    ctx.queue.schedule(
        CombatLogEvent::new(
            unit,
            unit,
            SpellId::NONE,
            EventPayload::PeriodicEnergize {
                amount: per_sec * interval as f64 / 1000.0,
                power: kind,
                aura_instance: 0,
                tick_period: interval,
            },
        ),
        due,
    )?;
    Ok(())
}

/// Reschedule natural regeneration after a regen tick fires
pub fn continue_regen(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let EventPayload::PeriodicEnergize {
        power,
        aura_instance: 0,
        ..
    } = event.payload
    else {
        return Ok(());
    };
    if ctx.state.unit(event.dest)?.dead {
        return Ok(());
    }
    let due = ctx.now() + ctx.config.regen_tick_ms.max(1);
    schedule_regen(ctx, event.dest, power, due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, ENEMY, PLAYER};
    use crate::lifecycle::begin_cast;
    use crate::{SpellBook, SpellDefinition, SpellEffect, EffectTarget};

    const BLEED: SpellId = SpellId(100);
    const FURY: SpellId = SpellId(101);
    const ROT: SpellId = SpellId(102);

    fn book() -> SpellBook {
        SpellBook::new()
            .with_aura(
                AuraDefinition::new(BLEED, "Bleed", 9000).with_periodic(PeriodicEffect {
                    kind: PeriodicKind::Damage,
                    interval_ms: 3000,
                    amount: 10.0,
                    ap_coefficient: 0.0,
                    sp_coefficient: 0.0,
                    hasted: true,
                    tick_on_apply: false,
                }),
            )
            .with_aura(
                AuraDefinition::new(FURY, "Fury", 15_000)
                    .with_max_stacks(3)
                    .with_stats(UnitStats {
                        haste_pct: 10.0,
                        ..UnitStats::default()
                    }),
            )
            .with_aura(
                AuraDefinition::new(ROT, "Rot", 10_000)
                    .with_refresh(RefreshMode::Pandemic),
            )
            .with_spell(
                SpellDefinition::new(SpellId(1), "Rend").with_effect(SpellEffect::ApplyAura {
                    aura: BLEED,
                    on: EffectTarget::Target,
                }),
            )
            .with_spell(
                SpellDefinition::new(SpellId(2), "Twin Fury")
                    .with_effect(SpellEffect::ApplyAura {
                        aura: FURY,
                        on: EffectTarget::Target,
                    })
                    .with_effect(SpellEffect::ApplyAura {
                        aura: FURY,
                        on: EffectTarget::Target,
                    }),
            )
    }

    fn removals(fx: &Fixture) -> Vec<SimTime> {
        fx.log
            .iter()
            .filter(|e| e.subevent() == Subevent::SpellAuraRemoved)
            .map(|e| e.timestamp)
            .collect()
    }

    #[test]
    fn test_stacking_and_refresh_decision() {
        let mut fx = Fixture::new(book());
        for t in [0, 1000, 2000, 3000] {
            fx.advance_to(t);
            apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
            fx.settle();
        }
        let aura = &fx.state.unit(PLAYER).unwrap().auras[&FURY];
        assert_eq!(aura.stacks, 3);
        assert_eq!(aura.expires_at, 18_000);
        assert_eq!(
            fx.subevents(),
            vec![
                Subevent::SpellAuraApplied,
                Subevent::SpellAuraAppliedDose,
                Subevent::SpellAuraAppliedDose,
                Subevent::SpellAuraRefresh,
            ]
        );

        let stats = effective_stats(&fx.state, &fx.data, PLAYER).unwrap();
        assert_eq!(stats.haste_pct, 30.0);
    }

    #[test]
    fn test_only_latest_removal_fires() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
        fx.advance_to(5000);
        apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();

        fx.advance_to(15_000);
        assert_eq!(fx.state.unit(PLAYER).unwrap().aura_stacks(FURY, 15_000), 2);

        fx.advance_to(20_000);
        assert!(fx.state.unit(PLAYER).unwrap().auras.is_empty());
        assert_eq!(removals(&fx), vec![20_000]);
    }

    #[test]
    fn test_applications_in_one_pass_stack() {
        let mut fx = Fixture::new(book());
        begin_cast(&mut fx.ctx(), PLAYER, SpellId(2), ENEMY).unwrap();
        fx.settle();

        let aura = &fx.state.unit(ENEMY).unwrap().auras[&FURY];
        assert_eq!(aura.stacks, 2);
        assert_eq!(aura.expires_at, 15_000);
        assert_eq!(
            fx.subevents(),
            vec![
                Subevent::SpellCastSuccess,
                Subevent::SpellAuraApplied,
                Subevent::SpellAuraAppliedDose,
            ]
        );

        fx.advance_to(20_000);
        assert_eq!(removals(&fx), vec![15_000]);
    }

    #[test]
    fn test_early_consume_logs_one_removal() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
        fx.advance_to(1000);
        consume_aura(&mut fx.ctx(), PLAYER, FURY, 1).unwrap();
        assert!(fx.state.unit(PLAYER).unwrap().auras.is_empty());

        fx.advance_to(20_000);
        assert_eq!(removals(&fx), vec![1000]);
    }

    #[test]
    fn test_reapply_after_consume_in_same_pass() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
        fx.advance_to(1000);
        consume_aura(&mut fx.ctx(), PLAYER, FURY, 1).unwrap();
        apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
        fx.settle();

        let aura = &fx.state.unit(PLAYER).unwrap().auras[&FURY];
        assert_eq!(aura.stacks, 1);
        assert_eq!(aura.expires_at, 16_000);

        fx.advance_to(20_000);
        assert!(fx.state.unit(PLAYER).unwrap().auras.is_empty());
        assert_eq!(removals(&fx), vec![1000, 16_000]);
    }

    #[test]
    fn test_pandemic_carries_capped_remainder() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, ENEMY, ROT).unwrap();
        fx.advance_to(8000);
        apply_aura(&mut fx.ctx(), PLAYER, ENEMY, ROT).unwrap();
        fx.settle();
        // 2000 remaining, below the 3000 cap
        assert_eq!(fx.state.unit(ENEMY).unwrap().auras[&ROT].expires_at, 20_000);

        fx.advance_to(9000);
        apply_aura(&mut fx.ctx(), PLAYER, ENEMY, ROT).unwrap();
        fx.settle();
        // 11000 remaining, capped at 3000
        assert_eq!(fx.state.unit(ENEMY).unwrap().auras[&ROT].expires_at, 22_000);
    }

    #[test]
    fn test_periodic_ticks_until_expiry() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, ENEMY, BLEED).unwrap();
        fx.advance_to(20_000);

        let ticks: Vec<SimTime> = fx
            .log
            .iter()
            .filter(|e| e.subevent() == Subevent::SpellPeriodicDamage)
            .map(|e| e.timestamp)
            .collect();
        assert_eq!(ticks, vec![3000, 6000, 9000]);
        assert_eq!(fx.state.unit(ENEMY).unwrap().health(), 970.0);
        assert!(fx.state.unit(ENEMY).unwrap().auras.is_empty());
    }

    #[test]
    fn test_consume_dose_then_remove() {
        let mut fx = Fixture::new(book());
        for _ in 0..3 {
            apply_aura(&mut fx.ctx(), PLAYER, PLAYER, FURY).unwrap();
            fx.settle();
        }
        consume_aura(&mut fx.ctx(), PLAYER, FURY, 2).unwrap();
        fx.settle();
        assert_eq!(fx.state.unit(PLAYER).unwrap().aura_stacks(FURY, 0), 1);

        consume_aura(&mut fx.ctx(), PLAYER, FURY, 1).unwrap();
        fx.settle();
        assert!(fx.state.unit(PLAYER).unwrap().auras.is_empty());
        assert_eq!(
            fx.subevents().last(),
            Some(&Subevent::SpellAuraRemoved)
        );
    }

    #[test]
    fn test_early_removal_cancels_ticks() {
        let mut fx = Fixture::new(book());
        apply_aura(&mut fx.ctx(), PLAYER, ENEMY, BLEED).unwrap();
        fx.advance_to(4000);
        consume_aura(&mut fx.ctx(), ENEMY, BLEED, 1).unwrap();
        fx.advance_to(20_000);

        let ticks = fx
            .log
            .iter()
            .filter(|e| e.subevent() == Subevent::SpellPeriodicDamage)
            .count();
        assert_eq!(ticks, 1);
    }

    #[test]
    fn test_refreshed_expiry_permanent() {
        let def = AuraDefinition::new(SpellId(9), "Stance", 0);
        assert_eq!(refreshed_expiry(&def, None, 500, 0.3), SimTime::MAX);
    }
}
