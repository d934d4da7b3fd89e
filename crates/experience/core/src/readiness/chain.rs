use core::fmt;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{ErrorSeverity, ExperienceErrorKind};

/// Position in the readiness chain. Ordered, so `stage >= Stage::AVAILABLE`
/// reads as "has reached at least Available".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stage(u8);

impl Stage {
    pub const SPAWNED: Self = Self(0);
    pub const AVAILABLE: Self = Self(1);
    pub const INITIALIZED: Self = Self(2);
    pub const READY: Self = Self(3);

    pub const ALL: [Self; ReadinessChain::LEN] =
        [Self::SPAWNED, Self::AVAILABLE, Self::INITIALIZED, Self::READY];

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The stage that follows `current`; `None` is before the first stage.
    pub const fn next_after(current: Option<Self>) -> Option<Self> {
        match current {
            None => Some(Self::SPAWNED),
            Some(Self(n)) if (n as usize) + 1 < ReadinessChain::LEN => Some(Self(n + 1)),
            Some(_) => None,
        }
    }
}

/// Configured identifier of one stage, e.g. `InitState.Spawned`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StageTag(Arc<str>);

impl StageTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(Arc::from(tag.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for StageTag {
    fn from(tag: String) -> Self {
        Self(Arc::from(tag))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("readiness chain needs exactly {expected} stages, got {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("readiness chain stage at index {index} is empty")]
    EmptyTag { index: usize },

    #[error("readiness chain lists `{tag}` more than once")]
    DuplicateTag { tag: String },
}

impl ExperienceErrorKind for ChainError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::WrongLength { .. } => "CHAIN_WRONG_LENGTH",
            Self::EmptyTag { .. } => "CHAIN_EMPTY_TAG",
            Self::DuplicateTag { .. } => "CHAIN_DUPLICATE_TAG",
        }
    }
}

/// The four ordered stages every actor feature progresses through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadinessChain {
    tags: [StageTag; Self::LEN],
}

impl ReadinessChain {
    pub const LEN: usize = 4;

    pub fn new(tags: [StageTag; Self::LEN]) -> Result<Self, ChainError> {
        let mut seen = HashSet::new();
        for (index, tag) in tags.iter().enumerate() {
            if tag.as_str().trim().is_empty() {
                return Err(ChainError::EmptyTag { index });
            }
            if !seen.insert(tag.as_str()) {
                return Err(ChainError::DuplicateTag {
                    tag: tag.to_string(),
                });
            }
        }
        Ok(Self { tags })
    }

    /// Builds a chain from configuration, which must list exactly four tags.
    pub fn from_tags<I, T>(tags: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = T>,
        T: Into<StageTag>,
    {
        let tags: Vec<StageTag> = tags.into_iter().map(Into::into).collect();
        let found = tags.len();
        let tags: [StageTag; Self::LEN] = tags.try_into().map_err(|_| ChainError::WrongLength {
            expected: Self::LEN,
            found,
        })?;
        Self::new(tags)
    }

    pub fn tag(&self, stage: Stage) -> &StageTag {
        &self.tags[stage.index()]
    }

    /// Looks a configured tag up by name.
    pub fn stage_of(&self, tag: &str) -> Option<Stage> {
        self.tags
            .iter()
            .position(|candidate| candidate.as_str() == tag)
            .map(|index| Stage::ALL[index])
    }

    pub fn tags(&self) -> &[StageTag] {
        &self.tags
    }

    /// Display helper for an optional stage.
    pub fn describe(&self, stage: Option<Stage>) -> &str {
        stage.map_or("<none>", |stage| self.tag(stage).as_str())
    }
}

impl Default for ReadinessChain {
    fn default() -> Self {
        Self {
            tags: [
                StageTag::new("InitState.Spawned"),
                StageTag::new("InitState.DataAvailable"),
                StageTag::new("InitState.DataInitialized"),
                StageTag::new("InitState.GameplayReady"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_one_at_a_time() {
        assert_eq!(Stage::next_after(None), Some(Stage::SPAWNED));
        assert_eq!(Stage::next_after(Some(Stage::SPAWNED)), Some(Stage::AVAILABLE));
        assert_eq!(Stage::next_after(Some(Stage::INITIALIZED)), Some(Stage::READY));
        assert_eq!(Stage::next_after(Some(Stage::READY)), None);
    }

    #[test]
    fn chain_requires_four_distinct_tags() {
        assert_eq!(
            ReadinessChain::from_tags(["a", "b", "c"]),
            Err(ChainError::WrongLength {
                expected: 4,
                found: 3
            })
        );
        assert_eq!(
            ReadinessChain::from_tags(["a", "b", "a", "d"]),
            Err(ChainError::DuplicateTag { tag: "a".into() })
        );
        assert_eq!(
            ReadinessChain::from_tags(["a", " ", "c", "d"]),
            Err(ChainError::EmptyTag { index: 1 })
        );
    }

    #[test]
    fn tags_map_back_to_stages() {
        let chain = ReadinessChain::from_tags(["s", "a", "i", "r"]).unwrap();
        assert_eq!(chain.stage_of("i"), Some(Stage::INITIALIZED));
        assert_eq!(chain.stage_of("x"), None);
        assert_eq!(chain.tag(Stage::READY).as_str(), "r");
        assert_eq!(chain.describe(None), "<none>");
    }
}
