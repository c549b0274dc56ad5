use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{Context, Result};
use tracing::{info, warn};

use docwright::config::Config;
use docwright::core::{Engine, RunReport};

#[derive(Parser)]
#[command(name = "docwright")]
#[command(about = "Call-graph aware documentation that only rebuilds what changed")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate documentation, reusing pages whose sources are unchanged
    Generate {
        /// Source directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory for documentation
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force regeneration of all docs
        #[arg(long)]
        force: bool,
    },

    /// Update only changed pages
    Sync {
        /// Dry run - show what would be updated
        #[arg(long)]
        dry_run: bool,

        /// Fail if changes would be made (useful for CI)
        #[arg(long)]
        fail_on_changes: bool,
    },

    /// Show which pages are stale and why
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = Config::load_or_default(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Commands::Generate { source, output, .. } = &self.command {
            if let Some(source) = source {
                config.project.source_dirs = vec![source.clone()];
            }
            if let Some(output) = output {
                config.project.docs_dir = output.clone();
            }
        }

        let root = std::env::current_dir().context("Cannot determine working directory")?;
        let engine = Engine::new(config, root)?;

        let cancel = engine.cancel_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing pages already in progress");
                cancel.cancel();
            }
        });

        match self.command {
            Commands::Generate { force, .. } => {
                let report = engine.generate(force).await?;
                print_report(&report);
            }
            Commands::Sync { dry_run, fail_on_changes } => {
                let report = engine.sync(dry_run, fail_on_changes).await?;
                print_report(&report);
            }
            Commands::Status => {
                let decisions = engine.status().await?;
                for (page, decision) in &decisions {
                    println!("{:<60} {}", page, serde_json::to_string(decision)?);
                }
                let stale = decisions.values().filter(|d| d.needs_regeneration()).count();
                println!("{} of {} pages need regeneration", stale, decisions.len());
            }
        }

        Ok(())
    }
}

fn print_report(report: &RunReport) {
    if report.regenerated.is_empty() && report.reused.is_empty() {
        for (page, decision) in &report.decisions {
            if decision.needs_regeneration() {
                println!("would regenerate {}", page);
            }
        }
    }
    for page in &report.regenerated {
        println!("regenerated {}", page);
    }
    for (page, reason) in &report.failed {
        println!("failed      {} ({})", page, reason);
    }
    for page in &report.skipped {
        println!("skipped     {}", page);
    }
    info!(
        "{} regenerated, {} reused, {} failed, {} skipped",
        report.regenerated.len(),
        report.reused.len(),
        report.failed.len(),
        report.skipped.len()
    );
}
