//! World events and the listener sink.
//!
//! Handlers raise events while they mutate the world; listeners run later,
//! at a safe point in the scheduling step. The two-phase raise/deliver split
//! is what keeps handlers non-re-entrant: a listener can observe the world
//! but is never invoked in the middle of a mutation.

use std::collections::HashMap;
use std::fmt;

use crate::entity::{EntityId, TypeTag};

// ---------------------------------------------------------------------------
// EventKind / WorldEvent
// ---------------------------------------------------------------------------

/// The kinds a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    EntitySpawned,
    EntityUsed,
    DayStarted,
    NightStarted,
}

/// One raised world event.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    EntitySpawned {
        entity: EntityId,
        tag: TypeTag,
        /// The entity whose action caused the spawn, when there is one.
        spawned_by: Option<EntityId>,
    },
    EntityUsed {
        entity: EntityId,
        by: EntityId,
    },
    DayStarted,
    NightStarted,
}

impl WorldEvent {
    /// The subscription kind this event is delivered under.
    pub fn kind(&self) -> EventKind {
        match self {
            WorldEvent::EntitySpawned { .. } => EventKind::EntitySpawned,
            WorldEvent::EntityUsed { .. } => EventKind::EntityUsed,
            WorldEvent::DayStarted => EventKind::DayStarted,
            WorldEvent::NightStarted => EventKind::NightStarted,
        }
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

type Listener = Box<dyn FnMut(&WorldEvent)>;

/// Maps event kinds to listener lists and buffers raised events until
/// delivery.
#[derive(Default)]
pub struct EventSink {
    listeners: HashMap<EventKind, Vec<Listener>>,
    pending: Vec<WorldEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to events of `kind`.
    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&WorldEvent) + 'static) {
        self.listeners.entry(kind).or_default().push(Box::new(listener));
    }

    /// Buffer an event for the next delivery pass.
    pub fn raise(&mut self, event: WorldEvent) {
        self.pending.push(event);
    }

    /// Invoke matching listeners for every buffered event, in raise order.
    pub fn deliver(&mut self) {
        for event in std::mem::take(&mut self.pending) {
            if let Some(listeners) = self.listeners.get_mut(&event.kind()) {
                for listener in listeners.iter_mut() {
                    listener(&event);
                }
            }
        }
    }

    /// Drop any undelivered events (used by reset).
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Number of buffered, undelivered events.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field(
                "listeners",
                &self.listeners.values().map(Vec::len).sum::<usize>(),
            )
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
