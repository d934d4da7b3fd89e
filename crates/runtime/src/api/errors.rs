//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the experience manager, the
//! activation ledger and pawn readiness so clients can bubble them up with
//! consistent context.

use experience_core::{ChainError, ErrorSeverity, ExperienceErrorKind};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::ledger::LedgerError;
use crate::manager::{LoadFailure, ManagerError};
use crate::pawn::PawnError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("session worker command channel closed")]
    CommandChannelClosed,

    #[error("session worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("session worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("invalid readiness chain")]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Pawn(#[from] PawnError),

    #[error("experience context requires `{name}` to be configured before building")]
    MissingCollaborator { name: &'static str },

    #[error("experience failed to load")]
    LoadFailed(#[source] LoadFailure),
}

impl ExperienceErrorKind for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
            Self::Manager(err) => err.severity(),
            Self::Ledger(err) => err.severity(),
            Self::Chain(err) => err.severity(),
            Self::Pawn(err) => err.severity(),
            Self::MissingCollaborator { .. } => ErrorSeverity::Validation,
            Self::LoadFailed(err) => err.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::Manager(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Chain(err) => err.error_code(),
            Self::Pawn(err) => err.error_code(),
            Self::MissingCollaborator { .. } => "RUNTIME_MISSING_COLLABORATOR",
            Self::LoadFailed(err) => err.error_code(),
        }
    }
}
