//! Spell lifecycle manager
//!
//! Drives a cast attempt through `Queued -> Casting -> Resolved` (or
//! `Interrupted` / `Failed`):
//!
//! - [`begin_cast`] validates, pays the cost, starts the GCD and schedules
//!   the resolving `SPELL_CAST_SUCCESS`.
//! - [`resolve_cast`] runs when that event fires: cooldown or charge
//!   bookkeeping, then every effect in declaration order.
//! - [`interrupt_cast`] cancels the pending resolution.
//!
//! Validation failures are reported as `SPELL_CAST_FAILED` events, never as
//! errors. Unknown spell, aura and unit ids are fatal.

use crate::aura::{apply_aura, consume_aura, effective_stats};
use crate::time::hasted;
use crate::{
    CastAttempt, CastFailReason, CastPhase, CombatLogEvent, CombatState, CooldownState,
    EffectTarget, EventPayload, HandlerContext, Result, SimTime, SpellDefinition, SpellEffect,
    SpellId, SpellTarget, StaticData, Subevent, UnitId, UnitStats,
};
use tracing::debug;

/// Result of asking a unit to cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    /// The cast passed validation; it resolves at `resolves_at`
    Started { serial: u64, resolves_at: SimTime },
    /// The cast was rejected and `SPELL_CAST_FAILED` was emitted
    Failed(CastFailReason),
}

impl CastOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, CastOutcome::Started { .. })
    }
}

/// Run the validation chain without side effects
///
/// Checks, in order: target, live cast, GCD, cooldown, charges, resource
/// cost, range, facing. Returns the first failing reason.
pub fn check_cast(
    state: &CombatState,
    def: &SpellDefinition,
    caster: UnitId,
    target: UnitId,
) -> Result<Option<CastFailReason>> {
    let now = state.now();
    let unit = state.unit(caster)?;

    let Some(target_unit) = state.get_unit(target) else {
        return Ok(Some(CastFailReason::InvalidTarget));
    };
    let target_ok = !unit.dead
        && !target_unit.dead
        && match def.target {
            SpellTarget::Enemy => unit.kind.is_hostile_to(target_unit.kind),
            SpellTarget::Friendly => !unit.kind.is_hostile_to(target_unit.kind),
            SpellTarget::SelfOnly => target == caster,
            SpellTarget::Any => true,
        };
    if !target_ok {
        return Ok(Some(CastFailReason::InvalidTarget));
    }

    if unit.is_casting() && !def.usable_while_casting {
        return Ok(Some(CastFailReason::AlreadyCasting));
    }

    if def.triggers_gcd && now < unit.gcd_ready_at {
        return Ok(Some(CastFailReason::GcdActive));
    }

    let cooldown = unit.cooldowns.get(&def.id);
    match def.charges {
        Some(charges) => {
            let available = cooldown.map(|c| c.charges).unwrap_or(charges.max);
            if available == 0 {
                return Ok(Some(CastFailReason::NoCharges));
            }
        }
        None => {
            if cooldown.map(|c| now < c.ready_at).unwrap_or(false) {
                return Ok(Some(CastFailReason::OnCooldown));
            }
        }
    }

    if let Some(cost) = def.cost {
        let affordable = unit
            .resources
            .get(&cost.kind)
            .map(|pool| pool.can_afford(cost.amount))
            .unwrap_or(false);
        if !affordable {
            return Ok(Some(CastFailReason::InsufficientResource));
        }
    }

    if target != caster {
        if let Some(range) = def.range {
            if unit.position.distance_to(&target_unit.position) > range {
                return Ok(Some(CastFailReason::OutOfRange));
            }
        }
        if def.requires_facing && !unit.position.is_facing(&target_unit.position) {
            return Ok(Some(CastFailReason::NotFacing));
        }
    }

    Ok(None)
}

/// Earliest time the GCD, cooldown and charges allow `def` to be cast
///
/// Ignores resource, range and target checks.
pub fn ready_at(state: &CombatState, def: &SpellDefinition, caster: UnitId) -> Result<SimTime> {
    let unit = state.unit(caster)?;
    let mut at = if def.triggers_gcd { unit.gcd_ready_at } else { 0 };
    if let Some(cooldown) = unit.cooldowns.get(&def.id) {
        let spell_ready = match def.charges {
            Some(_) if cooldown.charges == 0 => cooldown.recharge_at.unwrap_or(SimTime::MAX),
            Some(_) => 0,
            None => cooldown.ready_at,
        };
        at = at.max(spell_ready);
    }
    Ok(at.max(state.now()))
}

/// Attempt to begin casting `spell` from `caster` at `target`
pub fn begin_cast(
    ctx: &mut HandlerContext<'_>,
    caster: UnitId,
    spell: SpellId,
    target: UnitId,
) -> Result<CastOutcome> {
    let data = ctx.data;
    let def = data.spell(spell)?;
    let now = ctx.now();

    if let Some(reason) = check_cast(ctx.state, def, caster, target)? {
        debug!(%caster, %spell, %reason, at = now, "Cast failed validation");
        ctx.queue.emit(CombatLogEvent::new(
            caster,
            target,
            spell,
            EventPayload::CastFailed { reason },
        ))?;
        return Ok(CastOutcome::Failed(reason));
    }

    let stats = effective_stats(ctx.state, data, caster)?;
    let serial = ctx.state.next_cast_serial();
    let gcd = hasted(ctx.config.gcd_ms, stats.haste_pct).max(ctx.config.min_gcd_ms);

    let unit = ctx.state.unit_mut(caster)?;
    let cost_paid = match def.cost {
        Some(cost) => {
            let paid = unit
                .resources
                .get_mut(&cost.kind)
                .map(|pool| pool.spend(cost.amount))
                .unwrap_or(0.0);
            Some((cost.kind, paid))
        }
        None => None,
    };
    if def.triggers_gcd {
        unit.gcd_ready_at = now + gcd;
    }
    if let Some((kind, paid)) = cost_paid {
        ctx.state.stats.record_spent(kind, paid);
    }

    let cast_time = hasted(def.cast_time_ms, stats.haste_pct);
    let resolves_at = now + cast_time;
    if cast_time > 0 {
        ctx.queue.emit(CombatLogEvent::new(
            caster,
            target,
            spell,
            EventPayload::CastStart { cast_time },
        ))?;
    }
    let pending = ctx.queue.schedule(
        CombatLogEvent::new(
            caster,
            target,
            spell,
            EventPayload::CastSuccess {
                cast_serial: serial,
            },
        ),
        resolves_at,
    )?;

    if !def.usable_while_casting {
        ctx.state.unit_mut(caster)?.cast = Some(CastAttempt {
            serial,
            spell,
            target,
            phase: CastPhase::Casting,
            started_at: now,
            resolves_at,
            pending: Some(pending),
            cost_paid,
        });
    }

    debug!(%caster, %spell, %target, serial, resolves_at, "Cast started");
    Ok(CastOutcome::Started {
        serial,
        resolves_at,
    })
}

/// Resolve a cast when its `SPELL_CAST_SUCCESS` fires
pub fn resolve_cast(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let EventPayload::CastSuccess { cast_serial } = event.payload else {
        return Ok(());
    };
    let data = ctx.data;
    let def = data.spell(event.spell_id)?;
    let caster = event.source;

    let unit = ctx.state.unit_mut(caster)?;
    if unit.cast.as_ref().map(|c| c.serial) == Some(cast_serial) {
        unit.cast = None;
    }
    if unit.dead {
        return Ok(());
    }

    ctx.state.stats.record_cast(def.id);
    start_cooldown(ctx, caster, def)?;

    let stats = effective_stats(ctx.state, data, caster)?;
    for effect in &def.effects {
        run_effect(ctx, caster, event.dest, def, &stats, effect)?;
    }

    debug!(%caster, spell = %def.id, serial = cast_serial, "Cast resolved");
    Ok(())
}

fn start_cooldown(
    ctx: &mut HandlerContext<'_>,
    caster: UnitId,
    def: &SpellDefinition,
) -> Result<()> {
    let now = ctx.now();
    let unit = ctx.state.unit_mut(caster)?;

    let due = if let Some(charges) = def.charges {
        let cooldown = unit.cooldowns.entry(def.id).or_insert(CooldownState {
            charges: charges.max,
            max_charges: charges.max,
            ..CooldownState::default()
        });
        let was_full = cooldown.charges >= cooldown.max_charges;
        cooldown.charges = cooldown.charges.saturating_sub(1);
        if was_full {
            let at = now + charges.recovery_ms;
            cooldown.recharge_at = Some(at);
            Some((at, EventPayload::ChargeReady))
        } else {
            None
        }
    } else if def.cooldown_ms > 0 {
        let cooldown = unit.cooldowns.entry(def.id).or_default();
        cooldown.ready_at = cooldown.ready_at.max(now + def.cooldown_ms);
        Some((cooldown.ready_at, EventPayload::CooldownReady))
    } else {
        None
    };

    if let Some((at, payload)) = due {
        ctx.queue
            .schedule(CombatLogEvent::new(caster, caster, def.id, payload), at)?;
    }
    Ok(())
}

/// Regain one charge when `SPELL_CHARGE_READY` fires, scheduling the next
/// recovery if still below max
pub fn recover_charge(ctx: &mut HandlerContext<'_>, event: &CombatLogEvent) -> Result<()> {
    let data = ctx.data;
    let def = data.spell(event.spell_id)?;
    let Some(charges) = def.charges else {
        return Ok(());
    };
    let now = ctx.now();

    let unit = ctx.state.unit_mut(event.dest)?;
    let cooldown = unit.cooldowns.entry(def.id).or_insert(CooldownState {
        charges: charges.max,
        max_charges: charges.max,
        ..CooldownState::default()
    });
    cooldown.charges = (cooldown.charges + 1).min(cooldown.max_charges);

    if cooldown.charges < cooldown.max_charges {
        let at = now + charges.recovery_ms;
        cooldown.recharge_at = Some(at);
        ctx.queue.schedule(
            CombatLogEvent::new(event.dest, event.dest, def.id, EventPayload::ChargeReady),
            at,
        )?;
    } else {
        cooldown.recharge_at = None;
    }
    Ok(())
}

/// Make `spell` immediately castable again on `unit`
pub fn reset_cooldown(ctx: &mut HandlerContext<'_>, unit_id: UnitId, spell: SpellId) -> Result<()> {
    let now = ctx.now();
    let unit = ctx.state.unit_mut(unit_id)?;
    let Some(cooldown) = unit.cooldowns.get_mut(&spell) else {
        return Ok(());
    };
    cooldown.ready_at = now;
    cooldown.charges = cooldown.max_charges;
    cooldown.recharge_at = None;

    ctx.queue.cancel_where(|e| {
        e.dest == unit_id
            && e.spell_id == spell
            && matches!(
                e.subevent(),
                Subevent::SpellCooldownReady | Subevent::SpellChargeReady
            )
    });
    ctx.queue.emit(CombatLogEvent::new(
        unit_id,
        unit_id,
        spell,
        EventPayload::CooldownReady,
    ))?;
    Ok(())
}

/// Interrupt a unit's live cast
///
/// Cancels the pending resolution. The paid cost is refunded only when the
/// spell declares `refund_on_interrupt`. Returns the interrupted attempt.
pub fn interrupt_cast(ctx: &mut HandlerContext<'_>, unit_id: UnitId) -> Result<Option<CastAttempt>> {
    let data = ctx.data;
    let unit = ctx.state.unit_mut(unit_id)?;
    let Some(mut cast) = unit.cast.take() else {
        return Ok(None);
    };
    cast.phase = CastPhase::Interrupted;

    let def = data.spell(cast.spell)?;
    let mut refunded = None;
    if def.refund_on_interrupt {
        if let Some((kind, amount)) = cast.cost_paid {
            if let Some(pool) = unit.resources.get_mut(&kind) {
                pool.gain(amount);
                refunded = Some((kind, amount));
            }
        }
    }
    if let Some((kind, amount)) = refunded {
        ctx.state.stats.record_spent(kind, -amount);
    }
    if let Some(pending) = cast.pending {
        ctx.queue.cancel(pending);
    }

    debug!(unit = %unit_id, spell = %cast.spell, serial = cast.serial, "Cast interrupted");
    Ok(Some(cast))
}

/// Roll a direct amount: crit first, then variance, crit multiplier once
fn roll_amount(
    ctx: &mut HandlerContext<'_>,
    base: f64,
    crit_chance: f64,
    variance: f64,
) -> (f64, bool) {
    let critical = ctx.rng.next_float() * 100.0 < crit_chance;
    let mut amount = base;
    if variance > 0.0 {
        let spread = ctx.rng.next_float() * 2.0 - 1.0;
        amount *= 1.0 + spread * variance;
    }
    if critical {
        amount *= ctx.config.crit_multiplier;
    }
    (amount.max(0.0), critical)
}

/// Scaled base amount before rolls
pub fn scaled_amount(base: f64, ap_coefficient: f64, sp_coefficient: f64, stats: &UnitStats) -> f64 {
    base + stats.attack_power * ap_coefficient + stats.spell_power * sp_coefficient
}

fn living(state: &CombatState, unit: UnitId) -> bool {
    state.get_unit(unit).map(|u| !u.dead).unwrap_or(false)
}

fn run_effect(
    ctx: &mut HandlerContext<'_>,
    caster: UnitId,
    target: UnitId,
    def: &SpellDefinition,
    stats: &UnitStats,
    effect: &SpellEffect,
) -> Result<()> {
    let crit_chance = stats.crit_pct + def.crit_bonus_pct;
    let pick = |on: EffectTarget| match on {
        EffectTarget::Target => target,
        EffectTarget::Caster => caster,
    };

    match effect {
        SpellEffect::Damage {
            base,
            ap_coefficient,
            sp_coefficient,
            variance,
        } => {
            if !living(ctx.state, target) {
                return Ok(());
            }
            let base = scaled_amount(*base, *ap_coefficient, *sp_coefficient, stats);
            let (amount, critical) = roll_amount(ctx, base, crit_chance, *variance);
            ctx.queue.emit(CombatLogEvent::new(
                caster,
                target,
                def.id,
                EventPayload::Damage { amount, critical },
            ))?;
        }
        SpellEffect::Heal {
            base,
            ap_coefficient,
            sp_coefficient,
            variance,
            on,
        } => {
            let dest = pick(*on);
            if !living(ctx.state, dest) {
                return Ok(());
            }
            let base = scaled_amount(*base, *ap_coefficient, *sp_coefficient, stats);
            let (amount, critical) = roll_amount(ctx, base, crit_chance, *variance);
            ctx.queue.emit(CombatLogEvent::new(
                caster,
                dest,
                def.id,
                EventPayload::Heal { amount, critical },
            ))?;
        }
        SpellEffect::Energize { kind, amount } => {
            ctx.queue.emit(CombatLogEvent::new(
                caster,
                caster,
                def.id,
                EventPayload::Energize {
                    amount: *amount,
                    power: *kind,
                },
            ))?;
        }
        SpellEffect::ApplyAura { aura, on } => {
            apply_aura(ctx, caster, pick(*on), *aura)?;
        }
        SpellEffect::Proc { chance, aura, on } => {
            if ctx.rng.next_bool(*chance) {
                apply_aura(ctx, caster, pick(*on), *aura)?;
            }
        }
        SpellEffect::ConsumeAura { aura, stacks } => {
            consume_aura(ctx, caster, *aura, *stacks)?;
        }
        SpellEffect::ResetCooldown { spell } => {
            reset_cooldown(ctx, caster, *spell)?;
        }
        SpellEffect::Interrupt => {
            let casting = ctx
                .state
                .get_unit(target)
                .and_then(|u| u.cast.as_ref())
                .map(|c| c.spell);
            if let Some(interrupted) = casting {
                ctx.queue.emit(CombatLogEvent::new(
                    caster,
                    target,
                    def.id,
                    EventPayload::Interrupt {
                        interrupted_spell: Some(interrupted),
                    },
                ))?;
            }
        }
    }
    Ok(())
}

/// Whether `spell` is usable by `caster` on `target` right now
pub fn can_cast(
    state: &CombatState,
    data: &dyn StaticData,
    caster: UnitId,
    spell: SpellId,
    target: UnitId,
) -> Result<bool> {
    let def = data.spell(spell)?;
    Ok(check_cast(state, def, caster, target)?.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, ENEMY, PLAYER};
    use crate::{ResourceKind, SpellBook};

    fn book() -> SpellBook {
        SpellBook::new()
            .with_spell(
                SpellDefinition::new(SpellId(1), "Mortal Strike")
                    .with_cooldown(6000)
                    .with_cost(ResourceKind::Rage, 30.0)
                    .with_damage(100.0),
            )
            .with_spell(
                SpellDefinition::new(SpellId(2), "Fireball")
                    .with_cast_time(2000)
                    .with_cost(ResourceKind::Mana, 10.0)
                    .with_damage(300.0),
            )
            .with_spell(SpellDefinition::new(SpellId(3), "Charge").with_charges(2, 5000).off_gcd())
            .with_spell(
                SpellDefinition::new(SpellId(4), "Pummel")
                    .off_gcd()
                    .with_effect(SpellEffect::Interrupt),
            )
            .with_spell(
                SpellDefinition::new(SpellId(5), "Shoot")
                    .with_range(5.0)
                    .with_damage(1.0),
            )
    }

    #[test]
    fn test_instant_cast_resolves_same_time() {
        let mut fx = Fixture::new(book());
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        assert_eq!(
            outcome,
            CastOutcome::Started {
                serial: 1,
                resolves_at: 0
            }
        );
        assert!(fx.state.unit(PLAYER).unwrap().is_casting());

        fx.settle();
        let player = fx.state.unit(PLAYER).unwrap();
        assert!(!player.is_casting());
        assert_eq!(player.resource(ResourceKind::Rage), 70.0);
        assert_eq!(player.cooldowns[&SpellId(1)].ready_at, 6000);
        assert_eq!(player.gcd_ready_at, 1500);
        assert_eq!(fx.state.stats.total_casts, 1);
        assert_eq!(fx.state.unit(ENEMY).unwrap().health(), 900.0);
        assert_eq!(
            fx.subevents(),
            vec![
                Subevent::SpellCastSuccess,
                Subevent::SpellDamage,
            ]
        );
    }

    #[test]
    fn test_validation_order() {
        let mut fx = Fixture::new(book());
        begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        fx.settle();

        // Both GCD and cooldown are active; GCD is reported first
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::GcdActive));

        fx.advance_to(2000);
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::OnCooldown));

        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), PLAYER).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::InvalidTarget));

        fx.settle();
        assert_eq!(fx.state.stats.failed_casts, 3);
    }

    #[test]
    fn test_insufficient_resource_and_range() {
        let mut fx = Fixture::new(book());
        fx.state
            .unit_mut(PLAYER)
            .unwrap()
            .resources
            .get_mut(&ResourceKind::Rage)
            .unwrap()
            .current = 10.0;
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        assert_eq!(
            outcome,
            CastOutcome::Failed(CastFailReason::InsufficientResource)
        );

        fx.state.unit_mut(ENEMY).unwrap().position.x = 30.0;
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(5), ENEMY).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::OutOfRange));
    }

    #[test]
    fn test_cast_time_locks_caster() {
        let mut fx = Fixture::new(book());
        begin_cast(&mut fx.ctx(), PLAYER, SpellId(2), ENEMY).unwrap();
        fx.settle();
        assert!(fx.state.unit(PLAYER).unwrap().is_casting());

        fx.advance_to(1600);
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::AlreadyCasting));

        fx.advance_to(2000);
        assert!(!fx.state.unit(PLAYER).unwrap().is_casting());
        assert_eq!(fx.state.unit(ENEMY).unwrap().health(), 700.0);
    }

    #[test]
    fn test_interrupt_forfeits_cost() {
        let mut fx = Fixture::new(book());
        begin_cast(&mut fx.ctx(), ENEMY, SpellId(2), PLAYER).unwrap();
        fx.settle();
        assert_eq!(fx.state.unit(ENEMY).unwrap().resource(ResourceKind::Mana), 90.0);

        fx.advance_to(500);
        begin_cast(&mut fx.ctx(), PLAYER, SpellId(4), ENEMY).unwrap();
        fx.settle();

        let enemy = fx.state.unit(ENEMY).unwrap();
        assert!(!enemy.is_casting());
        assert_eq!(enemy.resource(ResourceKind::Mana), 90.0);

        fx.advance_to(5000);
        assert_eq!(fx.state.unit(PLAYER).unwrap().health(), 1000.0);
        assert!(fx.subevents().contains(&Subevent::SpellInterrupt));
        assert!(!fx.log.iter().any(|e| {
            e.subevent() == Subevent::SpellCastSuccess && e.spell_id == SpellId(2)
        }));
    }

    #[test]
    fn test_interrupt_refund() {
        let mut data = book();
        data.spells[&SpellId(2)].refund_on_interrupt = true;
        let mut fx = Fixture::new(data);
        begin_cast(&mut fx.ctx(), ENEMY, SpellId(2), PLAYER).unwrap();
        fx.settle();

        let cast = interrupt_cast(&mut fx.ctx(), ENEMY).unwrap().unwrap();
        assert_eq!(cast.phase, CastPhase::Interrupted);
        assert_eq!(fx.state.unit(ENEMY).unwrap().resource(ResourceKind::Mana), 100.0);
        assert!(interrupt_cast(&mut fx.ctx(), ENEMY).unwrap().is_none());
    }

    #[test]
    fn test_charges() {
        let mut fx = Fixture::new(book());
        for _ in 0..2 {
            let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(3), ENEMY).unwrap();
            assert!(outcome.is_started());
            fx.settle();
        }
        let outcome = begin_cast(&mut fx.ctx(), PLAYER, SpellId(3), ENEMY).unwrap();
        assert_eq!(outcome, CastOutcome::Failed(CastFailReason::NoCharges));
        assert_eq!(
            ready_at(&fx.state, &fx.data.spells[&SpellId(3)], PLAYER).unwrap(),
            5000
        );

        fx.advance_to(5000);
        assert_eq!(fx.state.unit(PLAYER).unwrap().cooldowns[&SpellId(3)].charges, 1);
        fx.advance_to(10_000);
        let cooldown = fx.state.unit(PLAYER).unwrap().cooldowns[&SpellId(3)];
        assert_eq!(cooldown.charges, 2);
        assert_eq!(cooldown.recharge_at, None);
    }

    #[test]
    fn test_reset_cooldown() {
        let mut fx = Fixture::new(book());
        begin_cast(&mut fx.ctx(), PLAYER, SpellId(1), ENEMY).unwrap();
        fx.settle();
        reset_cooldown(&mut fx.ctx(), PLAYER, SpellId(1)).unwrap();
        fx.settle();

        assert_eq!(fx.state.unit(PLAYER).unwrap().cooldowns[&SpellId(1)].ready_at, 0);
        fx.advance_to(10_000);
        let ready_events = fx
            .log
            .iter()
            .filter(|e| e.subevent() == Subevent::SpellCooldownReady)
            .count();
        assert_eq!(ready_events, 1);
    }

    #[test]
    fn test_unknown_spell_is_fatal() {
        let mut fx = Fixture::new(book());
        let err = begin_cast(&mut fx.ctx(), PLAYER, SpellId(999), ENEMY).unwrap_err();
        assert_eq!(err, crate::Error::UnknownSpell(SpellId(999)));
    }
}
