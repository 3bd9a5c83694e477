//! Shared fixture for unit tests: two units, the default handlers and a
//! minimal event loop

use crate::{
    default_registry, CombatLogEvent, CombatState, EventQueue, GameRng, HandlerContext,
    HandlerRegistry, ResourceKind, ResourcePool, SimConfig, SimTime, SpellBook, Subevent, Unit,
    UnitId, UnitKind,
};

pub(crate) const PLAYER: UnitId = UnitId(1);
pub(crate) const ENEMY: UnitId = UnitId(2);

pub(crate) struct Fixture {
    pub state: CombatState,
    pub queue: EventQueue,
    pub rng: GameRng,
    pub data: SpellBook,
    pub config: SimConfig,
    pub registry: HandlerRegistry,
    pub log: Vec<CombatLogEvent>,
}

impl Fixture {
    pub fn new(data: SpellBook) -> Self {
        let mut state = CombatState::new();
        state.add_unit(
            Unit::new(PLAYER, "player", UnitKind::Player)
                .with_resource(ResourceKind::Health, ResourcePool::full(1000.0))
                .with_resource(ResourceKind::Rage, ResourcePool::full(100.0))
                .with_resource(ResourceKind::Mana, ResourcePool::full(100.0)),
        );
        state.add_unit(
            Unit::new(ENEMY, "enemy", UnitKind::Enemy)
                .with_resource(ResourceKind::Health, ResourcePool::full(1000.0))
                .with_resource(ResourceKind::Mana, ResourcePool::full(100.0)),
        );
        Self {
            state,
            queue: EventQueue::new(),
            rng: GameRng::new(1),
            data,
            config: SimConfig::default(),
            registry: default_registry(),
            log: Vec::new(),
        }
    }

    pub fn ctx(&mut self) -> HandlerContext<'_> {
        HandlerContext {
            state: &mut self.state,
            queue: &mut self.queue,
            rng: &mut self.rng,
            data: &self.data,
            config: &self.config,
        }
    }

    /// Process everything due at the current time
    pub fn settle(&mut self) {
        let now = self.state.now();
        self.advance_to(now);
    }

    /// Process every event due up to `t`, then park the clock at `t`
    pub fn advance_to(&mut self, t: SimTime) {
        while let Some(pending) = self.queue.pop_due(t) {
            self.state.clock.advance_to(pending.due_at);
            self.queue.advance_to(pending.due_at);
            self.state.prune_expired();

            let mut ctx = HandlerContext {
                state: &mut self.state,
                queue: &mut self.queue,
                rng: &mut self.rng,
                data: &self.data,
                config: &self.config,
            };
            self.registry
                .dispatch(&pending.event, &mut ctx)
                .expect("dispatch failed");
            self.log.push(pending.event);
        }
        self.state.clock.advance_to(t);
        self.queue.advance_to(t);
        self.state.prune_expired();
    }

    pub fn subevents(&self) -> Vec<Subevent> {
        self.log.iter().map(|e| e.subevent()).collect()
    }
}
