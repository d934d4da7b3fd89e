//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{ExperienceEvent, PluginEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Load state transitions and load results
    Experience,
    /// Plugin activation and deactivation
    Plugin,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Experience(ExperienceEvent),
    Plugin(PluginEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Experience(_) => Topic::Experience,
            Event::Plugin(_) => Topic::Plugin,
        }
    }
}

impl From<ExperienceEvent> for Event {
    fn from(event: ExperienceEvent) -> Self {
        Event::Experience(event)
    }
}

impl From<PluginEvent> for Event {
    fn from(event: PluginEvent) -> Self {
        Event::Plugin(event)
    }
}

/// Topic-based event bus
///
/// One broadcast channel per topic, created up front so subscribing never
/// needs a lock. Clones share the same channels.
#[derive(Clone)]
pub struct EventBus {
    experience: broadcast::Sender<Event>,
    plugin: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            experience: broadcast::channel(capacity).0,
            plugin: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Experience => &self.experience,
            Topic::Plugin => &self.plugin,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
