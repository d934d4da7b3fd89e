//! Identifiers shared across content, runtime and replication.

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;

/// Stable identity of a loadable asset: a type name plus an asset name.
///
/// Rendered and parsed as `Type:Name`, e.g. `ExperienceDefinition:Shooter`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct PrimaryAssetId {
    asset_type: String,
    name: String,
}

impl PrimaryAssetId {
    pub const EXPERIENCE_TYPE: &'static str = "ExperienceDefinition";
    pub const ACTION_SET_TYPE: &'static str = "FeatureActionSet";
    pub const PAWN_DATA_TYPE: &'static str = "PawnData";

    pub fn new(asset_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            name: name.into(),
        }
    }

    pub fn experience(name: impl Into<String>) -> Self {
        Self::new(Self::EXPERIENCE_TYPE, name)
    }

    pub fn action_set(name: impl Into<String>) -> Self {
        Self::new(Self::ACTION_SET_TYPE, name)
    }

    pub fn pawn_data(name: impl Into<String>) -> Self {
        Self::new(Self::PAWN_DATA_TYPE, name)
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses `Type:Name`. A bare name is accepted when `default_type` is
    /// given, which lets command lines say `Experience=Shooter`.
    pub fn parse_with_default_type(
        value: &str,
        default_type: &str,
    ) -> Result<Self, AssetIdParseError> {
        match value.split_once(':') {
            Some(_) => value.parse(),
            None if !value.trim().is_empty() => Ok(Self::new(default_type, value.trim())),
            None => Err(AssetIdParseError::Empty),
        }
    }
}

impl fmt::Display for PrimaryAssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset_type, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AssetIdParseError {
    #[error("asset id is empty")]
    Empty,

    #[error("asset id `{0}` is not of the form Type:Name")]
    MissingSeparator(String),

    #[error("asset id `{0}` has an empty type or name")]
    EmptyPart(String),
}

impl crate::error::ExperienceErrorKind for AssetIdParseError {
    fn severity(&self) -> crate::error::ErrorSeverity {
        crate::error::ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "ASSET_ID_EMPTY",
            Self::MissingSeparator(_) => "ASSET_ID_MISSING_SEPARATOR",
            Self::EmptyPart(_) => "ASSET_ID_EMPTY_PART",
        }
    }
}

impl FromStr for PrimaryAssetId {
    type Err = AssetIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AssetIdParseError::Empty);
        }
        let (asset_type, name) = s
            .split_once(':')
            .ok_or_else(|| AssetIdParseError::MissingSeparator(s.to_string()))?;
        if asset_type.is_empty() || name.is_empty() {
            return Err(AssetIdParseError::EmptyPart(s.to_string()));
        }
        Ok(Self::new(asset_type, name))
    }
}

impl TryFrom<String> for PrimaryAssetId {
    type Error = AssetIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrimaryAssetId> for String {
    fn from(id: PrimaryAssetId) -> Self {
        id.to_string()
    }
}

/// Resolved location of a feature plugin, the key of the activation ledger.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PluginUrl(String);

impl PluginUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one running game session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Opaque handle to the world a session runs in; actions use it to scope
/// their effects to one world when several share a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldContextHandle(pub u32);

/// Identity of an actor tracked by the readiness registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Network role of the process hosting a session.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NetMode {
    #[default]
    Standalone,
    DedicatedServer,
    ListenServer,
    Client,
}

impl NetMode {
    /// True for every mode that owns authoritative game state.
    pub const fn has_authority(&self) -> bool {
        !matches!(self, Self::Client)
    }
}

bitflags! {
    /// Bundle categories requested when loading an experience's assets.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct LoadCategories: u8 {
        const EQUIPPED = 1 << 0;
        const CLIENT   = 1 << 1;
        const SERVER   = 1 << 2;
    }
}

impl LoadCategories {
    /// Categories for a session: `Equipped` always, `Client` unless this is a
    /// dedicated server, `Server` unless this is a pure client. Editor
    /// sessions load both halves.
    pub fn for_session(net_mode: NetMode, is_editor: bool) -> Self {
        let mut categories = Self::EQUIPPED;
        if is_editor || net_mode != NetMode::DedicatedServer {
            categories |= Self::CLIENT;
        }
        if is_editor || net_mode != NetMode::Client {
            categories |= Self::SERVER;
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_round_trips_through_display() {
        let id = PrimaryAssetId::experience("Shooter");
        assert_eq!(id.to_string(), "ExperienceDefinition:Shooter");
        assert_eq!(
            "ExperienceDefinition:Shooter".parse::<PrimaryAssetId>(),
            Ok(id)
        );
    }

    #[test]
    fn asset_id_rejects_malformed_input() {
        assert_eq!("".parse::<PrimaryAssetId>(), Err(AssetIdParseError::Empty));
        assert!(matches!(
            "Shooter".parse::<PrimaryAssetId>(),
            Err(AssetIdParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            ":Shooter".parse::<PrimaryAssetId>(),
            Err(AssetIdParseError::EmptyPart(_))
        ));
    }

    #[test]
    fn bare_names_take_the_default_type() {
        let id = PrimaryAssetId::parse_with_default_type(
            "Shooter",
            PrimaryAssetId::EXPERIENCE_TYPE,
        )
        .unwrap();
        assert_eq!(id, PrimaryAssetId::experience("Shooter"));
    }

    #[test]
    fn load_categories_follow_net_mode() {
        assert_eq!(
            LoadCategories::for_session(NetMode::DedicatedServer, false),
            LoadCategories::EQUIPPED | LoadCategories::SERVER
        );
        assert_eq!(
            LoadCategories::for_session(NetMode::Client, false),
            LoadCategories::EQUIPPED | LoadCategories::CLIENT
        );
        assert_eq!(
            LoadCategories::for_session(NetMode::Standalone, false),
            LoadCategories::all()
        );
        assert_eq!(
            LoadCategories::for_session(NetMode::Client, true),
            LoadCategories::all()
        );
    }

    #[test]
    fn net_mode_parses_case_insensitively() {
        assert_eq!(
            "Dedicated_Server".parse::<NetMode>(),
            Ok(NetMode::DedicatedServer)
        );
        assert_eq!(NetMode::ListenServer.to_string(), "listen_server");
    }
}
