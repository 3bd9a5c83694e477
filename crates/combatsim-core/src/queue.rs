//! Event queue and emitter
//!
//! A min-ordered priority queue of pending combat log events keyed by
//! `(due_at, seq)`. Events due at the same millisecond fire in the order they
//! were scheduled. Cancellation is lazy: cancelled ids are tombstoned and
//! skipped on pop, and the heap is compacted once tombstones dominate.

use crate::{CombatLogEvent, Error, EventId, Result, SimTime};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Tombstone count below which the heap is never compacted
const COMPACT_THRESHOLD: usize = 64;

/// An event waiting in the queue
#[derive(Debug, Clone)]
pub struct PendingEvent {
    /// Handle returned by [`EventQueue::schedule`]
    pub id: EventId,
    /// When the event fires
    pub due_at: SimTime,
    /// Insertion counter, breaks ties between equal `due_at`
    pub seq: u64,
    /// The stamped event
    pub event: CombatLogEvent,
}

impl PartialEq for PendingEvent {
    fn eq(&self, other: &Self) -> bool {
        self.due_at == other.due_at && self.seq == other.seq
    }
}

impl Eq for PendingEvent {}

impl PartialOrd for PendingEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingEvent {
    // Reversed so that BinaryHeap (a max-heap) pops the earliest event
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_at
            .cmp(&self.due_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered queue of pending events
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<PendingEvent>,
    /// Ids still in the heap and not cancelled
    live: HashSet<EventId>,
    /// Number of cancelled entries still occupying the heap
    tombstones: usize,
    next_seq: u64,
    now: SimTime,
}

impl EventQueue {
    /// Create an empty queue at t=0
    pub fn new() -> Self {
        Self::default()
    }

    /// The queue's view of the current time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Move the queue's notion of "now" forward
    ///
    /// Called by the sim driver whenever it advances the clock. Moving
    /// backwards is ignored.
    pub fn advance_to(&mut self, t: SimTime) {
        if t > self.now {
            self.now = t;
        }
    }

    /// The sequence number the next scheduled event will receive
    ///
    /// Every event popped with `seq >= ` a mark taken at some point was
    /// scheduled after that point.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Schedule an event at `due_at`, stamping its timestamp
    pub fn schedule(&mut self, event: CombatLogEvent, due_at: SimTime) -> Result<EventId> {
        if due_at < self.now {
            return Err(Error::ScheduleInPast {
                now: self.now,
                due: due_at,
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = EventId(seq);

        self.heap.push(PendingEvent {
            id,
            due_at,
            seq,
            event: event.stamped(due_at),
        });
        self.live.insert(id);
        Ok(id)
    }

    /// Schedule an event at the current time
    ///
    /// It fires in the next micro-pass, after everything already due now.
    pub fn emit(&mut self, event: CombatLogEvent) -> Result<EventId> {
        self.schedule(event, self.now)
    }

    /// Cancel a pending event
    ///
    /// Returns false if the event already fired or was already cancelled.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if !self.live.remove(&id) {
            return false;
        }
        self.tombstones += 1;
        self.maybe_compact();
        true
    }

    /// Cancel every pending event matching the predicate
    ///
    /// Returns the number of events cancelled.
    pub fn cancel_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&CombatLogEvent) -> bool,
    {
        let matching: Vec<EventId> = self
            .heap
            .iter()
            .filter(|p| self.live.contains(&p.id) && predicate(&p.event))
            .map(|p| p.id)
            .collect();

        for id in &matching {
            self.live.remove(id);
        }
        self.tombstones += matching.len();
        self.maybe_compact();
        matching.len()
    }

    /// Whether any live pending event matches the predicate
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&CombatLogEvent) -> bool,
    {
        self.heap
            .iter()
            .any(|p| self.live.contains(&p.id) && predicate(&p.event))
    }

    /// Remove and return the earliest live event due at or before `up_to`
    pub fn pop_due(&mut self, up_to: SimTime) -> Option<PendingEvent> {
        self.skip_tombstones();
        match self.heap.peek() {
            Some(top) if top.due_at <= up_to => {}
            _ => return None,
        }
        let pending = self.heap.pop()?;
        self.live.remove(&pending.id);
        Some(pending)
    }

    /// Remove and return every live event due at or before `up_to`, in
    /// `(due_at, seq)` order
    pub fn drain_due(&mut self, up_to: SimTime) -> Vec<CombatLogEvent> {
        let mut drained = Vec::new();
        while let Some(pending) = self.pop_due(up_to) {
            drained.push(pending.event);
        }
        drained
    }

    /// Due time of the earliest live event
    pub fn next_due(&mut self) -> Option<SimTime> {
        self.skip_tombstones();
        self.heap.peek().map(|p| p.due_at)
    }

    /// Number of live pending events
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no live events are pending
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Iterate over live pending events (heap order, not firing order)
    pub fn pending(&self) -> impl Iterator<Item = &PendingEvent> {
        self.heap.iter().filter(|p| self.live.contains(&p.id))
    }

    fn skip_tombstones(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.id) {
                break;
            }
            self.heap.pop();
            self.tombstones = self.tombstones.saturating_sub(1);
        }
    }

    fn maybe_compact(&mut self) {
        if self.tombstones < COMPACT_THRESHOLD || self.tombstones < self.live.len() {
            return;
        }
        let live = &self.live;
        let retained: Vec<PendingEvent> = std::mem::take(&mut self.heap)
            .into_iter()
            .filter(|p| live.contains(&p.id))
            .collect();
        self.heap = BinaryHeap::from(retained);
        self.tombstones = 0;
    }
}
