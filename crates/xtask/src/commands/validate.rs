//! Validate a content directory.
//!
//! Loads every file under the data directory the same way a session would and
//! reports unresolved references and definition errors.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use experience_content::ContentFactory;
use experience_runtime::{BuiltinActionFactory, ComponentRequests};
use serde::Serialize;

use crate::dirs;

/// Load a content directory and report validation issues
#[derive(Parser, Debug)]
pub struct Validate {
    /// Content directory (defaults to $EXPERIENCE_DATA_DIR or ./data)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Fail on warnings too
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    data_dir: String,
    experiences: usize,
    action_sets: usize,
    pawn_data: usize,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Validate {
    pub fn execute(self) -> Result<()> {
        let data_dir = self.data.unwrap_or_else(dirs::default_data_dir);
        let factory = BuiltinActionFactory::new(ComponentRequests::default());
        let bundle = ContentFactory::new(&data_dir)
            .load_bundle(&factory)
            .with_context(|| format!("Failed to load content from {}", data_dir.display()))?;

        let (errors, warnings): (Vec<_>, Vec<_>) =
            bundle.validate().into_iter().partition(|issue| issue.is_error());
        let report = Report {
            data_dir: data_dir.display().to_string(),
            experiences: bundle.experiences.len(),
            action_sets: bundle.action_sets.len(),
            pawn_data: bundle.pawn_data.len(),
            errors: errors.iter().map(ToString::to_string).collect(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }

        if !report.errors.is_empty() || (self.strict && !report.warnings.is_empty()) {
            anyhow::bail!(
                "validation failed: {} error(s), {} warning(s)",
                report.errors.len(),
                report.warnings.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &Report) {
    println!("{}", style("Experience content").green().bold());
    println!("  Directory:    {}", style(&report.data_dir).dim());
    println!("  Experiences:  {}", style(report.experiences).cyan());
    println!("  Action sets:  {}", style(report.action_sets).cyan());
    println!("  Pawn data:    {}", style(report.pawn_data).cyan());
    println!();

    for warning in &report.warnings {
        println!("{} {}", style("!").yellow().bold(), warning);
    }
    for error in &report.errors {
        println!("{} {}", style("✗").red().bold(), error);
    }

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("{}", style("✓ No issues found").green());
    }
}
