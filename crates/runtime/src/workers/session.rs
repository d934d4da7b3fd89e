//! Session worker that owns one [`ExperienceManager`].
//!
//! Receives commands from [`SessionHandle`](crate::api::SessionHandle) and
//! applies collaborator completions as they are posted, so deferred bundle
//! loads, plugin activations and pause tokens finish without any caller
//! polling the manager.

use std::sync::Arc;
use std::time::Duration;

use experience_core::{ExperienceDefinition, PrimaryAssetId};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::api::{Result, RuntimeError, SessionStatus};
use crate::manager::{ExperienceManager, LoadPriority, LoadState, LoadedCallback};

/// Commands that can be sent to the session worker
pub enum Command {
    SetCurrentExperience {
        id: PrimaryAssetId,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Observer side: the authority replicated its experience id.
    ApplyReplicatedExperience {
        id: PrimaryAssetId,
        reply: oneshot::Sender<Result<()>>,
    },
    RegisterOnLoaded {
        priority: LoadPriority,
        callback: LoadedCallback,
    },
    /// Resolves once the experience is loaded, or with the load failure.
    WaitReady {
        priority: LoadPriority,
        reply: oneshot::Sender<Result<Arc<ExperienceDefinition>>>,
    },
    QueryStatus {
        reply: oneshot::Sender<SessionStatus>,
    },
    EndPlay {
        reply: oneshot::Sender<()>,
    },
}

type SharedReply = Arc<Mutex<Option<oneshot::Sender<Result<Arc<ExperienceDefinition>>>>>>;

/// Background task that drives one session's experience.
pub struct ExperienceWorker {
    manager: ExperienceManager,
    command_rx: mpsc::Receiver<Command>,
    shutdown_grace: Duration,
}

impl ExperienceWorker {
    pub fn new(
        manager: ExperienceManager,
        command_rx: mpsc::Receiver<Command>,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            manager,
            command_rx,
            shutdown_grace,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(signal) = self.manager.next_signal() => {
                    self.manager.apply_signal(signal);
                    self.manager.pump();
                }
            }
        }

        self.shutdown().await;
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetCurrentExperience { id, reply } => {
                let result = self.manager.set_current_experience(id).map_err(RuntimeError::from);
                let _ = reply.send(result);
            }
            Command::ApplyReplicatedExperience { id, reply } => {
                let result = self
                    .manager
                    .on_replicated_experience(id)
                    .map_err(RuntimeError::from);
                let _ = reply.send(result);
            }
            Command::RegisterOnLoaded { priority, callback } => {
                self.manager
                    .call_or_register_on_experience_loaded(priority, callback);
            }
            Command::WaitReady { priority, reply } => self.wait_ready(priority, reply),
            Command::QueryStatus { reply } => {
                let _ = reply.send(self.status());
            }
            Command::EndPlay { reply } => {
                self.manager.end_play();
                let _ = reply.send(());
            }
        }
    }

    fn wait_ready(
        &mut self,
        priority: LoadPriority,
        reply: oneshot::Sender<Result<Arc<ExperienceDefinition>>>,
    ) {
        if let Ok(experience) = self.manager.loaded_experience() {
            // Already loaded: answer on the next scheduler turn rather than
            // inside the command handler.
            let experience = Arc::clone(experience);
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                let _ = reply.send(Ok(experience));
            });
            return;
        }

        let shared: SharedReply = Arc::new(Mutex::new(Some(reply)));

        let on_loaded = Arc::clone(&shared);
        self.manager
            .call_or_register_on_experience_loaded(priority, move |experience| {
                if let Some(reply) = on_loaded.lock().take() {
                    let _ = reply.send(Ok(Arc::clone(experience)));
                }
            });

        let on_failed = Arc::clone(&shared);
        self.manager
            .call_or_register_on_experience_load_failed(move |failure| {
                if let Some(reply) = on_failed.lock().take() {
                    let _ = reply.send(Err(RuntimeError::LoadFailed(failure.clone())));
                }
            });
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            session: self.manager.session().id,
            load_state: self.manager.load_state(),
            experience: self.manager.replicated_experience().cloned(),
            outstanding_pausers: self.manager.outstanding_pausers(),
            failure: self.manager.load_failure().map(ToString::to_string),
        }
    }

    /// Ends play if the session is still active and waits, up to the grace
    /// period, for paused deactivations to finish.
    async fn shutdown(&mut self) {
        let session = self.manager.session().id;
        if self.manager.load_state() != LoadState::Unloaded {
            info!(target: "experience::worker", %session, "handle dropped; ending play");
            self.manager.end_play();
        }

        while self.manager.load_state() == LoadState::Deactivating {
            match tokio::time::timeout(self.shutdown_grace, self.manager.next_signal()).await {
                Ok(Some(signal)) => {
                    self.manager.apply_signal(signal);
                    self.manager.pump();
                }
                Ok(None) => break,
                Err(_) => {
                    error!(
                        target: "experience::worker",
                        %session,
                        outstanding = self.manager.outstanding_pausers(),
                        "deactivation stalled; pause tokens never completed"
                    );
                    return;
                }
            }
        }

        if self.manager.load_state() == LoadState::Unloaded {
            debug!(target: "experience::worker", %session, "session worker stopped");
        } else {
            warn!(
                target: "experience::worker",
                %session,
                state = %self.manager.load_state(),
                "session worker stopped before unloading"
            );
        }
    }
}
