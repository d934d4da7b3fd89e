//! Worker tasks that back the session API.
//!
//! Each session runs one worker that owns its experience manager, so the
//! state machine is only ever touched from that task.

mod session;

pub use session::{Command, ExperienceWorker};
