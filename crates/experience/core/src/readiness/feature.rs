use core::fmt;
use std::borrow::Cow;

use super::chain::{ReadinessChain, Stage};

/// Name a feature registers under on an actor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureName(Cow<'static, str>);

impl FeatureName {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for FeatureName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

/// Notification sent to every other feature on an actor after one advances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageChange {
    pub feature: FeatureName,
    pub stage: Stage,
}

/// Read-only view of the stages reached by every feature on one actor.
#[derive(Clone, Copy)]
pub struct FeatureView<'a> {
    stages: &'a [(FeatureName, Option<Stage>)],
    chain: &'a ReadinessChain,
}

impl<'a> FeatureView<'a> {
    pub(crate) fn new(stages: &'a [(FeatureName, Option<Stage>)], chain: &'a ReadinessChain) -> Self {
        Self { stages, chain }
    }

    pub fn chain(&self) -> &'a ReadinessChain {
        self.chain
    }

    /// Stage of a named sibling; `None` if unregistered or not yet spawned.
    pub fn stage_of(&self, feature: &FeatureName) -> Option<Stage> {
        self.stages
            .iter()
            .find(|(name, _)| name == feature)
            .and_then(|(_, stage)| *stage)
    }

    pub fn has_reached(&self, feature: &FeatureName, stage: Stage) -> bool {
        self.stage_of(feature).is_some_and(|current| current >= stage)
    }

    /// True when every registered feature, including the caller, is at or
    /// past `stage`.
    pub fn all_reached(&self, stage: Stage) -> bool {
        self.stages
            .iter()
            .all(|(_, current)| current.is_some_and(|current| current >= stage))
    }
}

/// A component that progresses through the readiness chain on one actor.
///
/// `A` is the actor data the predicates inspect (pawn, controller and player
/// state flags for pawns). The registry owns both the actor data and every
/// feature registered on it, and is the only caller of these methods.
pub trait ActorFeature<A>: Send {
    fn feature_name(&self) -> FeatureName;

    /// Whether the move from `current` to `desired` may happen now.
    /// `desired` is always the stage right after `current`.
    fn can_advance(
        &self,
        actor: &A,
        current: Option<Stage>,
        desired: Stage,
        view: &FeatureView<'_>,
    ) -> bool;

    /// Side effect of an approved transition.
    fn on_advance(&mut self, _actor: &mut A, _current: Option<Stage>, _desired: Stage) {}

    /// Called when another feature on the same actor advanced. Returning
    /// `true` re-runs default advancement for this feature.
    fn on_sibling_changed(&mut self, _change: &StageChange) -> bool {
        true
    }
}
