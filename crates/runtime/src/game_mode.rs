//! Experience selection and default pawn data resolution.
//!
//! The authority picks which experience a session runs from several sources
//! in a fixed order, and decides which pawn data a player spawns with.

use std::sync::Arc;

use experience_core::{ExperienceDefinition, PawnData, PrimaryAssetId};
use tracing::{error, info};

use crate::context::ExperienceContext;
use crate::manager::{ExperienceManager, ManagerError};

/// Where the selected experience id came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SelectionSource {
    UrlOptions,
    DeveloperSettings,
    CommandLine,
    WorldSettings,
    Default,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExperienceSelection {
    pub id: PrimaryAssetId,
    pub source: SelectionSource,
}

/// Everything experience selection looks at, highest precedence first.
#[derive(Clone, Debug, Default)]
pub struct SelectionInputs {
    /// Travel URL options such as `?Experience=Shooter?Listen`.
    pub url_options: Option<String>,
    /// Developer override; honoured only in editor sessions.
    pub developer_experience: Option<PrimaryAssetId>,
    pub command_line: Vec<String>,
    pub world_default: Option<PrimaryAssetId>,
    pub is_editor: bool,
}

/// Authority-side policy for experience and pawn data defaults.
#[derive(Clone)]
pub struct GameMode {
    context: Arc<ExperienceContext>,
    default_experience: Option<PrimaryAssetId>,
    default_pawn_data: Option<PrimaryAssetId>,
}

impl GameMode {
    pub fn new(context: Arc<ExperienceContext>) -> Self {
        Self {
            context,
            default_experience: None,
            default_pawn_data: None,
        }
    }

    /// Experience used ahead of the settings default.
    #[must_use]
    pub fn with_default_experience(mut self, id: PrimaryAssetId) -> Self {
        self.default_experience = Some(id);
        self
    }

    /// Pawn data used ahead of the settings default.
    #[must_use]
    pub fn with_default_pawn_data(mut self, id: PrimaryAssetId) -> Self {
        self.default_pawn_data = Some(id);
        self
    }

    /// Picks the first candidate that resolves to a known experience.
    ///
    /// Order: URL options, developer settings (editor only), command line,
    /// world settings, the game mode default, the settings default.
    pub fn select_experience(&self, inputs: &SelectionInputs) -> Option<ExperienceSelection> {
        let mut candidates: Vec<(PrimaryAssetId, SelectionSource)> = Vec::new();

        if let Some(value) = inputs.url_options.as_deref().and_then(|options| url_option(options, "Experience")) {
            push_parsed(&mut candidates, value, SelectionSource::UrlOptions);
        }
        if inputs.is_editor
            && let Some(id) = &inputs.developer_experience
        {
            candidates.push((id.clone(), SelectionSource::DeveloperSettings));
        }
        if let Some(value) = command_line_value(&inputs.command_line, "Experience") {
            push_parsed(&mut candidates, value, SelectionSource::CommandLine);
        }
        if let Some(id) = &inputs.world_default {
            candidates.push((id.clone(), SelectionSource::WorldSettings));
        }
        for id in [
            self.default_experience.as_ref(),
            self.context.settings().default_experience.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            candidates.push((id.clone(), SelectionSource::Default));
        }

        for (id, source) in candidates {
            if self.context.assets().resolve_experience(&id).is_some() {
                info!(target: "experience::game_mode", experience = %id, %source, "experience selected");
                return Some(ExperienceSelection { id, source });
            }
            error!(
                target: "experience::game_mode",
                experience = %id,
                %source,
                "selected experience could not be resolved; trying the next source"
            );
        }

        error!(target: "experience::game_mode", "no experience could be selected");
        None
    }

    /// Selects an experience and starts loading it on `manager`.
    pub fn assign_experience(
        &self,
        manager: &mut ExperienceManager,
        inputs: &SelectionInputs,
    ) -> Result<Option<ExperienceSelection>, ManagerError> {
        let Some(selection) = self.select_experience(inputs) else {
            return Ok(None);
        };
        manager.set_current_experience(selection.id.clone())?;
        Ok(Some(selection))
    }

    /// Pawn data for a player in a loaded experience: the player's own, the
    /// experience default, the game mode default, then the settings default.
    pub fn pawn_data_for_experience(
        &self,
        experience: &ExperienceDefinition,
        player: Option<&Arc<PawnData>>,
    ) -> Option<Arc<PawnData>> {
        if let Some(pawn_data) = player.or(experience.default_pawn_data()) {
            return Some(Arc::clone(pawn_data));
        }

        [
            self.default_pawn_data.as_ref(),
            self.context.settings().default_pawn_data.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find_map(|id| self.context.assets().resolve_pawn_data(id))
    }

    /// Like [`pawn_data_for_experience`](Self::pawn_data_for_experience) for
    /// the session's current experience; `None` until it is loaded.
    pub fn pawn_data_for_controller(
        &self,
        manager: &ExperienceManager,
        player: Option<&Arc<PawnData>>,
    ) -> Option<Arc<PawnData>> {
        let experience = manager.loaded_experience().ok()?;
        self.pawn_data_for_experience(experience, player)
    }
}

impl std::fmt::Debug for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameMode")
            .field("default_experience", &self.default_experience)
            .field("default_pawn_data", &self.default_pawn_data)
            .finish_non_exhaustive()
    }
}

fn push_parsed(
    candidates: &mut Vec<(PrimaryAssetId, SelectionSource)>,
    value: &str,
    source: SelectionSource,
) {
    match PrimaryAssetId::parse_with_default_type(value, PrimaryAssetId::EXPERIENCE_TYPE) {
        Ok(id) => candidates.push((id, source)),
        Err(err) => error!(
            target: "experience::game_mode",
            value,
            %source,
            error = %err,
            "malformed experience id"
        ),
    }
}

/// Value of `key` in `?Key=Value?Other` style options. Keys ignore case.
pub fn url_option<'a>(options: &'a str, key: &str) -> Option<&'a str> {
    options
        .split('?')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, value)| value.trim())
}

/// Value of `Key=Value` (optionally `-Key=Value`) on a command line.
pub fn command_line_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .filter_map(|arg| arg.trim_start_matches('-').split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}
