//! Topic-based event bus for session lifecycle events.
//!
//! Events are published per topic; consumers subscribe only to the topics
//! they need. Publishing is best-effort and never blocks the session.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{ExperienceEvent, PluginEvent};
