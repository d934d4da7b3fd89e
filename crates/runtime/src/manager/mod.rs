//! Experience manager: loads one experience per session, activates its
//! feature plugins and actions, and tears them down at session end.

mod experience;
mod state;

pub use experience::{ExperienceManager, FailedCallback, LoadedCallback};
pub use state::{LoadFailure, LoadPriority, LoadState, ManagerError, SessionInfo};
