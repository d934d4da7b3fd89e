//! Data-driven experience content and loaders.
//!
//! This crate reads the RON/TOML files that describe experiences:
//! - Experience settings (TOML)
//! - Feature action specs, resolved into implementations by an [`ActionFactory`]
//! - Feature action sets (RON)
//! - Pawn data (RON)
//! - Experience definitions (one RON file per experience)
//!
//! Entries that reference unknown actions, sets or pawn data are kept as holes
//! in the resulting definitions so validation can report them by index.

pub mod loaders;

pub use loaders::{
    ActionCatalog, ActionFactory, ActionKindSpec, ActionSetLoader, ActionSpec, ComponentEntrySpec,
    ContentBundle, ContentFactory, ExperienceLoader, LoadResult, PawnDataLoader, SettingsLoader,
};
