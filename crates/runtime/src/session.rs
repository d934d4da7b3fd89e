//! Session orchestration.
//!
//! A [`Session`] owns the worker task that drives one experience manager and
//! hands out cloneable [`SessionHandle`]s to clients.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use experience_core::NetMode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{Result, RuntimeError, SessionHandle};
use crate::context::ExperienceContext;
use crate::events::EventBus;
use crate::manager::{ExperienceManager, SessionInfo};
use crate::workers::{Command, ExperienceWorker};

/// Session configuration shared by the orchestrator and its worker.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub net_mode: NetMode,
    pub is_editor: bool,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    /// How long a shutting-down worker waits for paused deactivations.
    pub shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            net_mode: NetMode::Standalone,
            is_editor: false,
            command_buffer_size: 32,
            event_buffer_size: 100,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `EXPERIENCE_NET_MODE`, `EXPERIENCE_EDITOR` and
    /// `EXPERIENCE_COMMAND_BUFFER`. Unparsable values are ignored with a
    /// warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(net_mode) = read_env::<NetMode>("EXPERIENCE_NET_MODE") {
            config.net_mode = net_mode;
        }
        if let Some(is_editor) = read_env::<bool>("EXPERIENCE_EDITOR") {
            config.is_editor = is_editor;
        }
        if let Some(size) = read_env::<usize>("EXPERIENCE_COMMAND_BUFFER") {
            config.command_buffer_size = size.max(1);
        }
        config
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    let value = std::env::var(key).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(target: "experience::session", key, value = %value, "ignoring unparsable environment value");
            None
        }
    }
}

/// Running session: one worker task plus its handle.
pub struct Session {
    handle: SessionHandle,
    worker: JoinHandle<()>,
}

impl Session {
    pub fn builder(context: Arc<ExperienceContext>) -> SessionBuilder {
        SessionBuilder::new(context)
    }

    /// Get a cloneable handle to this session
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Shut the session down gracefully.
    ///
    /// The worker exits once every handle is dropped, ending play first if the
    /// experience is still active.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        self.worker.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    context: Arc<ExperienceContext>,
    config: SessionConfig,
    event_bus: Option<EventBus>,
}

impl SessionBuilder {
    fn new(context: Arc<ExperienceContext>) -> Self {
        Self {
            context,
            config: SessionConfig::default(),
            event_bus: None,
        }
    }

    /// Override session configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Publish to an existing bus, e.g. one shared by several sessions.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Build the session and spawn its worker
    pub async fn build(self) -> Result<Session> {
        let (id, world) = self.context.allocate_session();
        let info = SessionInfo::new(id, world, self.config.net_mode).editor(self.config.is_editor);

        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(self.config.event_buffer_size));
        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);

        let manager = ExperienceManager::new(Arc::clone(&self.context), info).with_events(event_bus.clone());
        let worker = ExperienceWorker::new(manager, command_rx, self.config.shutdown_grace);
        let worker = tokio::spawn(async move {
            worker.run().await;
        });

        info!(
            target: "experience::session",
            session = %id,
            net_mode = %self.config.net_mode,
            editor = self.config.is_editor,
            "session started"
        );

        Ok(Session {
            handle: SessionHandle::new(command_tx, event_bus, id),
            worker,
        })
    }
}
