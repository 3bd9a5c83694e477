//! Handler registry
//!
//! Maps each [`Subevent`] to an ordered list of handler registrations. For a
//! fixed subevent, handlers fire in ascending priority and then in
//! registration order. The registry is built once at startup, frozen behind
//! an `Arc`, and shared by every simulation on every worker.
//!
//! # Failure policy
//!
//! A failing handler aborts the iteration when its registration is
//! [`Criticality::Fatal`] or when the error itself is fatal
//! ([`Error::is_fatal`]). Otherwise the fault is logged, recorded in the
//! [`DispatchReport`], and the remaining handlers still run.

use crate::{
    CombatLogEvent, CombatState, Error, EventQueue, RandomSource, Result, SimConfig, SimTime,
    StaticData, Subevent,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a handler may read or mutate while processing one event
pub struct HandlerContext<'a> {
    pub state: &'a mut CombatState,
    pub queue: &'a mut EventQueue,
    pub rng: &'a mut dyn RandomSource,
    pub data: &'a dyn StaticData,
    pub config: &'a SimConfig,
}

impl HandlerContext<'_> {
    /// Current simulation time
    pub fn now(&self) -> SimTime {
        self.state.now()
    }
}

/// Handler callback signature
pub type HandlerFn = dyn Fn(&CombatLogEvent, &mut HandlerContext<'_>) -> Result<()> + Send + Sync;

/// Narrow filter evaluated before the callback
pub type Predicate = dyn Fn(&CombatLogEvent) -> bool + Send + Sync;

/// What a handler failure does to the iteration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criticality {
    /// Any error aborts the iteration
    Fatal,
    /// Non-fatal errors are logged and recorded; dispatch continues
    #[default]
    Recoverable,
}

/// A handler bound to one subevent
#[derive(Clone)]
pub struct HandlerRegistration {
    pub id: String,
    pub subevent: Subevent,
    /// Lower runs first
    pub priority: i32,
    pub predicate: Option<Arc<Predicate>>,
    pub criticality: Criticality,
    pub callback: Arc<HandlerFn>,
}

impl HandlerRegistration {
    /// A recoverable handler at priority 0 without predicate
    pub fn new<F>(id: impl Into<String>, subevent: Subevent, callback: F) -> Self
    where
        F: Fn(&CombatLogEvent, &mut HandlerContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            subevent,
            priority: 0,
            predicate: None,
            criticality: Criticality::Recoverable,
            callback: Arc::new(callback),
        }
    }

    /// Builder: set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: only run when the predicate holds
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&CombatLogEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Builder: any failure aborts the iteration
    pub fn fatal(mut self) -> Self {
        self.criticality = Criticality::Fatal;
        self
    }

    fn accepts(&self, event: &CombatLogEvent) -> bool {
        self.predicate.as_ref().map(|p| p(event)).unwrap_or(true)
    }
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("id", &self.id)
            .field("subevent", &self.subevent)
            .field("priority", &self.priority)
            .field("predicate", &self.predicate.is_some())
            .field("criticality", &self.criticality)
            .finish()
    }
}

/// A handler failure that did not abort the iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerFault {
    pub handler: String,
    pub subevent: Subevent,
    pub at: SimTime,
    pub message: String,
}

/// Outcome of dispatching one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Handlers whose predicate accepted the event
    pub handled: usize,
    /// Recovered faults
    pub faults: Vec<HandlerFault>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Subevent-keyed dispatch table
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: IndexMap<Subevent, Vec<HandlerRegistration>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler
    pub fn register(&mut self, registration: HandlerRegistration) {
        let list = self.handlers.entry(registration.subevent).or_default();
        list.push(registration);
        // Stable: equal priorities keep registration order
        list.sort_by_key(|h| h.priority);
    }

    /// Builder: register a handler
    pub fn with(mut self, registration: HandlerRegistration) -> Self {
        self.register(registration);
        self
    }

    /// Handlers for a subevent in firing order
    pub fn handlers_for(&self, subevent: Subevent) -> &[HandlerRegistration] {
        self.handlers
            .get(&subevent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Check if no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every matching handler against `event`
    pub fn dispatch(
        &self,
        event: &CombatLogEvent,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<DispatchReport> {
        let subevent = event.subevent();
        let mut report = DispatchReport::default();

        for handler in self.handlers_for(subevent) {
            if !handler.accepts(event) {
                continue;
            }
            report.handled += 1;

            let Err(err) = (handler.callback)(event, ctx) else {
                continue;
            };

            if handler.criticality == Criticality::Fatal {
                return Err(match err {
                    Error::Handler(message) => Error::HandlerFault {
                        handler: handler.id.clone(),
                        subevent,
                        message,
                    },
                    other => other,
                });
            }
            if err.is_fatal() {
                return Err(err);
            }

            warn!(
                handler = %handler.id,
                subevent = %subevent,
                at = event.timestamp,
                error = %err,
                "Recovered handler fault"
            );
            report.faults.push(HandlerFault {
                handler: handler.id.clone(),
                subevent,
                at: event.timestamp,
                message: err.to_string(),
            });
        }

        debug!(
            subevent = %subevent,
            at = event.timestamp,
            handled = report.handled,
            "Dispatched event"
        );
        Ok(report)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.handlers
                    .iter()
                    .map(|(k, v)| (k, v.iter().map(|h| h.id.as_str()).collect::<Vec<_>>())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventPayload, GameRng, SpellBook, SpellId, UnitId};
    use std::sync::Mutex;

    fn heal_event() -> CombatLogEvent {
        CombatLogEvent::new(
            UnitId(1),
            UnitId(1),
            SpellId(5),
            EventPayload::Heal {
                amount: 10.0,
                critical: false,
            },
        )
    }

    struct Fixture {
        state: CombatState,
        queue: EventQueue,
        rng: GameRng,
        data: SpellBook,
        config: SimConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                state: CombatState::new(),
                queue: EventQueue::new(),
                rng: GameRng::new(1),
                data: SpellBook::new(),
                config: SimConfig::default(),
            }
        }

        fn ctx(&mut self) -> HandlerContext<'_> {
            HandlerContext {
                state: &mut self.state,
                queue: &mut self.queue,
                rng: &mut self.rng,
                data: &self.data,
                config: &self.config,
            }
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> HandlerRegistration {
        let log = Arc::clone(log);
        HandlerRegistration::new(name, Subevent::SpellHeal, move |_, _| {
            log.lock().unwrap().push(name);
            Ok(())
        })
    }

    #[test]
    fn test_priority_then_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new()
            .with(recorder(&log, "late").with_priority(10))
            .with(recorder(&log, "first_a"))
            .with(recorder(&log, "first_b"))
            .with(recorder(&log, "early").with_priority(-5));

        let mut fixture = Fixture::new();
        let report = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap();

        assert_eq!(report.handled, 4);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["early", "first_a", "first_b", "late"]
        );
    }

    #[test]
    fn test_predicate_filters() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new()
            .with(recorder(&log, "matching").with_predicate(|e| e.spell_id == SpellId(5)))
            .with(recorder(&log, "skipped").with_predicate(|e| e.spell_id == SpellId(6)));

        let mut fixture = Fixture::new();
        let report = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap();
        assert_eq!(report.handled, 1);
        assert_eq!(*log.lock().unwrap(), vec!["matching"]);
    }

    #[test]
    fn test_recoverable_fault_continues() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new()
            .with(HandlerRegistration::new("broken", Subevent::SpellHeal, |_, _| {
                Err(Error::Handler("boom".into()))
            }))
            .with(recorder(&log, "after"));

        let mut fixture = Fixture::new();
        let report = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap();

        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].handler, "broken");
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_fatal_registration_aborts() {
        let registry = HandlerRegistry::new().with(
            HandlerRegistration::new("strict", Subevent::SpellHeal, |_, _| {
                Err(Error::Handler("boom".into()))
            })
            .fatal(),
        );

        let mut fixture = Fixture::new();
        let err = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap_err();
        assert_eq!(
            err,
            Error::HandlerFault {
                handler: "strict".into(),
                subevent: Subevent::SpellHeal,
                message: "boom".into(),
            }
        );
    }

    #[test]
    fn test_fatal_error_kind_aborts_recoverable_handler() {
        let registry = HandlerRegistry::new().with(HandlerRegistration::new(
            "lookup",
            Subevent::SpellHeal,
            |_, ctx| ctx.data.spell(SpellId(404)).map(|_| ()),
        ));

        let mut fixture = Fixture::new();
        let err = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap_err();
        assert_eq!(err, Error::UnknownSpell(SpellId(404)));
    }

    #[test]
    fn test_unhandled_subevent() {
        let registry = HandlerRegistry::new();
        let mut fixture = Fixture::new();
        let report = registry.dispatch(&heal_event(), &mut fixture.ctx()).unwrap();
        assert_eq!(report.handled, 0);
        assert!(report.is_clean());
        assert!(registry.is_empty());
    }
}
