//! Domain types for data-driven gameplay experiences.
//!
//! An experience is an immutable configuration record that names the feature
//! plugins a session needs, the setup actions to run once those plugins are
//! active, and the default pawn data for players. This crate holds the pure
//! pieces shared by content loaders and the runtime:
//!
//! - [`ids`] identifiers, net modes and bundle load categories
//! - [`definition`] experience definitions, action sets and pawn data
//! - [`action`] the [`FeatureAction`] trait and its activation contexts
//! - [`readiness`] the four-stage readiness chain and per-actor feature registry
//! - [`validation`] authoring-time diagnostics for definitions
//! - [`config`] process-wide experience settings
//! - [`error`] severity classification shared by every error enum
pub mod action;
pub mod config;
pub mod definition;
pub mod error;
pub mod ids;
pub mod readiness;
pub mod validation;

pub use action::{
    ActivationContext, DeactivationContext, FeatureAction, PauseNotifier, PauseToken,
};
pub use config::ExperienceSettings;
pub use definition::{
    ActionSlot, ExperienceDefinition, ExperienceDefinitionBuilder, FeatureActionSet, PawnData,
};
pub use error::{ErrorSeverity, ExperienceErrorKind};
pub use ids::{
    ActorId, AssetIdParseError, LoadCategories, NetMode, PluginUrl, PrimaryAssetId, SessionId,
    WorldContextHandle,
};
pub use readiness::{
    ActorFeature, ActorFeatureRegistry, ChainError, FeatureName, FeatureView, ReadinessChain,
    RegistryError, Stage, StageChange, StageTag,
};
pub use validation::{DataValidation, ValidationContext, ValidationIssue};
