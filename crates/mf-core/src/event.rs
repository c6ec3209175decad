use std::collections::VecDeque;

use crate::entity::{EntityId, EntityType};
use crate::system::SystemId;

/// Lifecycle notifications published by the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    /// An entity finished construction and was offered to every system.
    EntityCreated {
        /// The new entity.
        entity: EntityId,
        /// Its type.
        entity_type: EntityType,
    },
    /// An entity left every system and released its components.
    EntityDestroyed {
        /// The destroyed entity.
        entity: EntityId,
        /// Its type.
        entity_type: EntityType,
    },
    /// A component was attached after creation.
    ComponentAdded {
        /// The entity that gained the component.
        entity: EntityId,
        /// Short type name of the component.
        component: &'static str,
    },
    /// A component was detached before destruction.
    ComponentRemoved {
        /// The entity that lost the component.
        entity: EntityId,
        /// Short type name of the component.
        component: &'static str,
    },
    /// A system-defined event.
    Custom {
        /// A label identifying the custom event type.
        label: String,
        /// The entities involved.
        entities: Vec<EntityId>,
    },
}

impl WorldEvent {
    /// The topic subscribers must hold to receive this event.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::EntityCreated { .. } => EventTopic::EntityCreated,
            Self::EntityDestroyed { .. } => EventTopic::EntityDestroyed,
            Self::ComponentAdded { .. } | Self::ComponentRemoved { .. } => {
                EventTopic::ComponentChanged
            }
            Self::Custom { .. } => EventTopic::Custom,
        }
    }

    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, id: EntityId) -> bool {
        match self {
            Self::EntityCreated { entity, .. }
            | Self::EntityDestroyed { entity, .. }
            | Self::ComponentAdded { entity, .. }
            | Self::ComponentRemoved { entity, .. } => *entity == id,
            Self::Custom { entities, .. } => entities.contains(&id),
        }
    }
}

/// What a system can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTopic {
    /// [`WorldEvent::EntityCreated`].
    EntityCreated,
    /// [`WorldEvent::EntityDestroyed`].
    EntityDestroyed,
    /// Component added or removed after creation.
    ComponentChanged,
    /// [`WorldEvent::Custom`].
    Custom,
}

/// The topics one system listens to. Filled in by `System::add_events`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions {
    topics: Vec<EventTopic>,
}

impl Subscriptions {
    /// Add `topic`. Subscribing twice has no further effect.
    pub fn subscribe(&mut self, topic: EventTopic) -> &mut Self {
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
        self
    }

    /// Whether `topic` is subscribed.
    pub fn contains(&self, topic: EventTopic) -> bool {
        self.topics.contains(&topic)
    }

    /// Subscribed topics, in subscription order.
    pub fn topics(&self) -> &[EventTopic] {
        &self.topics
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// A published event with its world-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Position in the world's publication order, starting at 1.
    pub seq: u64,
    /// The event itself.
    pub event: WorldEvent,
}

/// Bounded history of published events.
#[derive(Debug, Default)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    max_events: usize,
    next_seq: u64,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            records: VecDeque::new(),
            max_events,
            next_seq: 0,
        }
    }

    /// Append an event, dropping the oldest ones past capacity. Returns the
    /// event's sequence number.
    pub fn push(&mut self, event: WorldEvent) -> u64 {
        self.next_seq += 1;
        self.records.push_back(EventRecord {
            seq: self.next_seq,
            event,
        });
        if self.max_events > 0 {
            while self.records.len() > self.max_events {
                self.records.pop_front();
            }
        }
        self.next_seq
    }

    /// Retained events, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Return all retained events involving the given entity.
    pub fn involving(&self, id: EntityId) -> Vec<&EventRecord> {
        self.records.iter().filter(|r| r.event.involves(id)).collect()
    }

    /// Total events ever published, including those already dropped.
    pub fn total(&self) -> u64 {
        self.next_seq
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no events are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every retained event. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Pending events plus per-system subscriptions. Owned by the world.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    pending: VecDeque<WorldEvent>,
    // Subscription order is registration order.
    subscribers: Vec<(SystemId, Subscriptions)>,
    log: EventLog,
}

impl EventBus {
    pub(crate) fn new(history: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            subscribers: Vec::new(),
            log: EventLog::new(history),
        }
    }

    pub(crate) fn publish(&mut self, event: WorldEvent) {
        self.log.push(event.clone());
        self.pending.push_back(event);
    }

    pub(crate) fn subscribe(&mut self, system: SystemId, subs: Subscriptions) {
        if !subs.is_empty() {
            self.subscribers.push((system, subs));
        }
    }

    pub(crate) fn unsubscribe(&mut self, system: SystemId) {
        self.subscribers.retain(|(id, _)| *id != system);
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn take_pending(&mut self) -> VecDeque<WorldEvent> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn subscribers_of(&self, topic: EventTopic) -> Vec<SystemId> {
        self.subscribers
            .iter()
            .filter(|(_, subs)| subs.contains(topic))
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn log(&self) -> &EventLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(n: u64) -> WorldEvent {
        WorldEvent::EntityCreated {
            entity: EntityId(n),
            entity_type: EntityType::Monster,
        }
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 1..=5 {
            log.push(created(i));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.total(), 5);
        let seqs: Vec<u64> = log.records().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![4, 5]);
    }

    #[test]
    fn event_log_unlimited_capacity() {
        let mut log = EventLog::new(0);
        for i in 0..1000 {
            log.push(created(i));
        }
        assert_eq!(log.len(), 1000);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn event_involves_entity() {
        let custom = WorldEvent::Custom {
            label: "trap sprung".into(),
            entities: vec![EntityId(1), EntityId(2)],
        };
        assert!(custom.involves(EntityId(2)));
        assert!(!custom.involves(EntityId(3)));
        assert!(created(4).involves(EntityId(4)));
    }

    #[test]
    fn component_events_share_a_topic() {
        let added = WorldEvent::ComponentAdded {
            entity: EntityId(1),
            component: "Position",
        };
        let removed = WorldEvent::ComponentRemoved {
            entity: EntityId(1),
            component: "Position",
        };
        assert_eq!(added.topic(), EventTopic::ComponentChanged);
        assert_eq!(removed.topic(), EventTopic::ComponentChanged);
    }

    #[test]
    fn subscriptions_dedupe() {
        let mut subs = Subscriptions::default();
        subs.subscribe(EventTopic::Custom)
            .subscribe(EventTopic::Custom)
            .subscribe(EventTopic::EntityCreated);
        assert_eq!(subs.topics(), &[EventTopic::Custom, EventTopic::EntityCreated]);
    }

    #[test]
    fn bus_routes_by_topic() {
        let mut bus = EventBus::new(0);
        let mut a = Subscriptions::default();
        a.subscribe(EventTopic::EntityCreated);
        let mut b = Subscriptions::default();
        b.subscribe(EventTopic::Custom);
        bus.subscribe(SystemId(1), a);
        bus.subscribe(SystemId(2), b);

        assert_eq!(bus.subscribers_of(EventTopic::EntityCreated), vec![SystemId(1)]);
        bus.unsubscribe(SystemId(1));
        assert!(bus.subscribers_of(EventTopic::EntityCreated).is_empty());

        bus.publish(created(1));
        assert!(bus.has_pending());
        assert_eq!(bus.take_pending().len(), 1);
        assert!(!bus.has_pending());
        assert_eq!(bus.log().len(), 1);
    }
}
