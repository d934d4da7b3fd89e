//! Simulate sessions against a content directory.
//!
//! Every session runs on its own worker exactly as a game process would run
//! it, sharing one asset manager, plugin subsystem and activation ledger. In
//! deferred mode a background task completes bundle loads and plugin
//! activations on a fixed tick.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use experience_content::ContentFactory;
use experience_core::{NetMode, PluginUrl, PrimaryAssetId};
use experience_runtime::{
    AssetManager, BuiltinActionFactory, CompletionMode, ComponentRequests, ExperienceContext,
    GameMode, InMemoryPluginSubsystem, LoadPriority, SelectionInputs, Session, SessionConfig,
    SessionStatus,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{dirs, logging};

/// Run sessions against a content directory and report their lifecycle
#[derive(Parser, Debug)]
pub struct Simulate {
    /// Content directory (defaults to $EXPERIENCE_DATA_DIR or ./data)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Experience to load; selected like a game mode would when omitted
    #[arg(long)]
    pub experience: Option<String>,

    /// Travel URL options used for selection, e.g. `?Experience=Lobby`
    #[arg(long)]
    pub url: Option<String>,

    /// Number of concurrent sessions
    #[arg(long, default_value = "1")]
    pub sessions: usize,

    /// Network mode of every session
    #[arg(long, default_value = "standalone", value_parser = parse_net_mode)]
    pub net_mode: NetMode,

    /// Complete loads from a background tick instead of immediately
    #[arg(long)]
    pub deferred: bool,

    /// Tick interval in milliseconds for deferred completion
    #[arg(long, default_value = "10")]
    pub tick: u64,

    /// Seconds to wait for each session to finish loading
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write logs to this file (`-` picks the default log directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PluginUsage {
    url: PluginUrl,
    requests: u32,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    experience: PrimaryAssetId,
    source: String,
    sessions: Vec<SessionStatus>,
    resident_assets: Vec<PrimaryAssetId>,
    plugins_while_loaded: Vec<PluginUsage>,
    plugins_after_end_play: Vec<PluginUsage>,
}

impl Simulate {
    pub fn execute(self) -> Result<()> {
        let log_file = self.log_file.as_ref().map(|path| {
            if path.as_os_str() == "-" {
                dirs::log_dir().join("simulate.log")
            } else {
                path.clone()
            }
        });
        let _guard = logging::init(log_file.as_deref())?;

        let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
        let report = runtime.block_on(self.run())?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }

    async fn run(&self) -> Result<SimulationReport> {
        let data_dir = self.data.clone().unwrap_or_else(dirs::default_data_dir);
        let mode = if self.deferred {
            CompletionMode::Deferred
        } else {
            CompletionMode::Immediate
        };

        let requests = ComponentRequests::default();
        let bundle = ContentFactory::new(&data_dir)
            .load_bundle(&BuiltinActionFactory::new(requests.clone()))
            .with_context(|| format!("Failed to load content from {}", data_dir.display()))?;

        let assets = Arc::new(AssetManager::from_bundle(&bundle, mode));
        let plugins = Arc::new(
            bundle
                .experiences
                .iter()
                .flat_map(|experience| experience.plugin_names())
                .fold(InMemoryPluginSubsystem::new(mode), |subsystem, name| {
                    subsystem.with_plugin(name)
                }),
        );
        let context = ExperienceContext::builder()
            .settings(bundle.settings.clone())
            .assets(assets.clone())
            .plugins(plugins.clone())
            .components(requests)
            .build()?;

        let (experience, source) = match &self.experience {
            Some(name) => (
                PrimaryAssetId::parse_with_default_type(name, PrimaryAssetId::EXPERIENCE_TYPE)?,
                "command_line".to_string(),
            ),
            None => {
                let inputs = SelectionInputs {
                    url_options: self.url.clone(),
                    ..SelectionInputs::default()
                };
                let selection = GameMode::new(Arc::clone(&context))
                    .select_experience(&inputs)
                    .context("No experience could be selected from the content")?;
                (selection.id, selection.source.to_string())
            }
        };
        let plugin_urls: Vec<PluginUrl> = bundle
            .experience(&experience)
            .map(|definition| {
                definition
                    .plugin_names()
                    .iter()
                    .map(|name| InMemoryPluginSubsystem::url_for(name))
                    .collect()
            })
            .unwrap_or_default();

        let ticker = self.deferred.then(|| {
            let assets = Arc::clone(&assets);
            let plugins = Arc::clone(&plugins);
            let period = Duration::from_millis(self.tick.max(1));
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    assets.process_pending();
                    plugins.process_pending();
                }
            })
        });

        let config = SessionConfig {
            net_mode: self.net_mode,
            ..SessionConfig::from_env()
        };
        context.ledger().reset_for_new_play_session();
        let mut sessions = Vec::with_capacity(self.sessions);
        for _ in 0..self.sessions {
            let session = Session::builder(Arc::clone(&context))
                .config(config.clone())
                .build()
                .await?;
            session
                .handle()
                .set_current_experience(experience.clone())
                .await?;
            sessions.push(session);
        }

        let mut statuses = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let handle = session.handle();
            let wait = handle.wait_experience_ready(LoadPriority::Low);
            match tokio::time::timeout(Duration::from_secs(self.timeout), wait).await {
                Ok(Ok(loaded)) => {
                    info!(target: "experience::xtask", session = %handle.session_id(), experience = %loaded.id(), "session ready");
                }
                Ok(Err(err)) => {
                    warn!(target: "experience::xtask", session = %handle.session_id(), error = %err, "session failed to load");
                }
                Err(_) => {
                    warn!(target: "experience::xtask", session = %handle.session_id(), "timed out waiting for session");
                }
            }
            statuses.push(handle.status().await?);
        }

        let usage = |urls: &[PluginUrl]| -> Vec<PluginUsage> {
            urls.iter()
                .map(|url| PluginUsage {
                    url: url.clone(),
                    requests: context.ledger().request_count(url),
                })
                .collect()
        };
        let plugins_while_loaded = usage(&plugin_urls);
        let resident_assets = assets.loaded_assets();

        for session in sessions {
            session.handle().end_play().await?;
            session.shutdown().await?;
        }
        if let Some(ticker) = ticker {
            ticker.abort();
        }

        Ok(SimulationReport {
            experience,
            source,
            sessions: statuses,
            resident_assets,
            plugins_while_loaded,
            plugins_after_end_play: usage(&plugin_urls),
        })
    }
}

fn parse_net_mode(value: &str) -> Result<NetMode, String> {
    value.parse().map_err(|_| {
        format!("unknown net mode '{value}' (standalone, dedicated_server, listen_server, client)")
    })
}

fn print_report(report: &SimulationReport) {
    println!("{}", style("Experience simulation").green().bold());
    println!(
        "  Experience: {} ({})",
        style(&report.experience).cyan(),
        style(&report.source).dim()
    );
    println!();

    for status in &report.sessions {
        let state = match &status.failure {
            Some(failure) => style(format!("{} - {failure}", status.load_state)).red(),
            None => style(status.load_state.to_string()).green(),
        };
        println!("  session {}  {}", style(status.session).cyan(), state);
    }
    println!();

    println!("{}", style("Resident assets").bold());
    for id in &report.resident_assets {
        println!("  {}", style(id).dim());
    }
    println!();

    println!("{}", style("Plugin requests").bold());
    for (loaded, ended) in report
        .plugins_while_loaded
        .iter()
        .zip(&report.plugins_after_end_play)
    {
        println!(
            "  {}  {} -> {}",
            style(&loaded.url).dim(),
            loaded.requests,
            ended.requests
        );
    }
}
