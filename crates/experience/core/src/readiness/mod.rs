//! Actor feature readiness.
//!
//! Every actor carries a set of named features (the pawn extension, the hero
//! component, anything an experience adds). Each feature walks forward through
//! the same four configured stages, one step at a time, gated by predicates
//! that may look at the stages its siblings have reached.
//!
//! - [`ReadinessChain`] holds the four stage tags
//! - [`ActorFeature`] is implemented by each feature component
//! - [`ActorFeatureRegistry`] tracks stages per actor and relays changes

mod chain;
mod feature;
mod registry;

pub use chain::{ChainError, ReadinessChain, Stage, StageTag};
pub use feature::{ActorFeature, FeatureName, FeatureView, StageChange};
pub use registry::{ActorFeatureRegistry, RegistryError};
