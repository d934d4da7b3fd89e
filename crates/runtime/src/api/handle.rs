//! Cloneable façade for issuing commands to a session.
//!
//! [`SessionHandle`] hides channel plumbing and offers async helpers for
//! driving the experience lifecycle or streaming events from specific topics.

use std::sync::Arc;

use experience_core::{ExperienceDefinition, PrimaryAssetId, SessionId};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::manager::{LoadPriority, LoadState};
use crate::workers::Command;

/// Snapshot of a session's experience lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session: SessionId,
    pub load_state: LoadState,
    pub experience: Option<PrimaryAssetId>,
    pub outstanding_pausers: usize,
    pub failure: Option<String>,
}

/// Client-facing handle to interact with one session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    session: SessionId,
}

impl SessionHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus, session: SessionId) -> Self {
        Self {
            command_tx,
            event_bus,
            session,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    /// Start loading `id` as this session's experience.
    pub async fn set_current_experience(&self, id: PrimaryAssetId) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::SetCurrentExperience {
            id,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Apply an experience id replicated from the authority.
    pub async fn apply_replicated_experience(&self, id: PrimaryAssetId) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::ApplyReplicatedExperience {
            id,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Run `callback` on the session worker once the experience is loaded,
    /// or right away if it already is.
    pub async fn on_experience_loaded(
        &self,
        priority: LoadPriority,
        callback: impl FnOnce(&Arc<ExperienceDefinition>) + Send + 'static,
    ) -> Result<()> {
        self.send(Command::RegisterOnLoaded {
            priority,
            callback: Box::new(callback),
        })
        .await
    }

    /// Wait until the experience is loaded.
    ///
    /// Subscribes at `priority`, so the wait completes after the callbacks of
    /// higher priorities ran. Resolves with [`RuntimeError::LoadFailed`] if the
    /// load fails instead.
    pub async fn wait_experience_ready(&self, priority: LoadPriority) -> Result<Arc<ExperienceDefinition>> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::WaitReady {
            priority,
            reply: reply_tx,
        })
        .await?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Query the session's load state (read-only snapshot)
    pub async fn status(&self) -> Result<SessionStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::QueryStatus { reply: reply_tx }).await?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// End play: release plugins and deactivate the experience's actions.
    ///
    /// Returns once teardown has started; paused deactivations may still be
    /// outstanding (see [`SessionStatus::outstanding_pausers`]).
    pub async fn end_play(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.send(Command::EndPlay { reply: reply_tx }).await?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Experience` - Load state transitions and load results
    /// - `Topic::Plugin` - Feature plugin activation and deactivation
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }
}
