//! Session runtime for data-driven gameplay experiences.
//!
//! A session selects one experience, loads its asset bundles, activates the
//! feature plugins it names, runs its actions and tears all of it down again
//! when play ends. Pawns spawned into the session are brought to
//! gameplay-ready through the readiness chain.
//!
//! Modules are organized by responsibility:
//! - [`context`] holds the process-wide state every session shares
//! - [`manager`] is the per-session experience state machine
//! - [`ledger`] reference-counts plugin activation requests across sessions
//! - [`assets`] and [`plugins`] are the loading collaborators
//! - [`actions`] and [`components`] implement built-in feature actions
//! - [`pawn`], [`game_mode`] and [`player_state`] cover player setup
//! - [`session`] and [`api`] run a manager on its own worker task
//! - [`events`] provides topic-based event bus for lifecycle events
pub mod actions;
pub mod api;
pub mod assets;
pub mod components;
pub mod context;
pub mod events;
pub mod game_mode;
pub mod ledger;
pub mod manager;
pub mod pawn;
pub mod player_state;
pub mod plugins;
pub mod session;

mod workers;

pub use actions::{AddComponentsAction, BuiltinActionFactory, ComponentEntry};
pub use api::{Result, RuntimeError, SessionHandle, SessionStatus};
pub use assets::{AssetManager, BundleLoader, CompletionMode, LoadHandle, LoadOutcome};
pub use components::{ComponentRequest, ComponentRequests};
pub use context::{ExperienceContext, ExperienceContextBuilder};
pub use events::{Event, EventBus, ExperienceEvent, PluginEvent, Topic};
pub use game_mode::{ExperienceSelection, GameMode, SelectionInputs, SelectionSource};
pub use ledger::{LedgerError, PluginActivationLedger};
pub use manager::{
    ExperienceManager, FailedCallback, LoadFailure, LoadPriority, LoadState, LoadedCallback,
    ManagerError, SessionInfo,
};
pub use pawn::{
    HeroFeature, PawnError, PawnExtensionFeature, PawnReadiness, PawnState, TrackingFeature,
};
pub use player_state::{PlayerState, PlayerStateError, SharedPlayerState};
pub use plugins::{InMemoryPluginSubsystem, PluginCompletion, PluginError, PluginState, PluginSubsystem};
pub use session::{Session, SessionBuilder, SessionConfig};
