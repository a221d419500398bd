//! Vigil CLI - Main Entry Point
//!
//! Drives the hybrid visual testing pipeline: automated Playwright probes
//! with baseline diffing, an optional vision-model critique pass, and the
//! merged report whose verdict becomes the process exit code.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use vigil_visual::{
    critique, report, BaselineStore, CritiqueReport, RunConfig, VisionClient, VisualRunner,
};

mod output;

use output::OutputFormat;

/// Vigil - Hybrid Visual Regression Testing
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full hybrid pipeline: automated probes plus vision critique
    Run {
        /// Project root receiving screenshots and report artifacts
        project_path: PathBuf,

        /// Base URL of the running application
        base_url: String,

        /// Skip the vision-model critique phase
        #[arg(long)]
        no_ai: bool,

        /// Optional YAML run configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Automated visual testing only
    Visual {
        project_path: PathBuf,
        base_url: String,

        /// Optional YAML run configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Vision-model critique over existing screenshots
    Critique {
        project_path: PathBuf,

        /// Optional YAML run configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List stored baselines, or replace one from its current capture
    Baselines {
        project_path: PathBuf,

        /// Page identifier whose baseline should be replaced
        #[arg(long)]
        update: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let code = match cli.command {
        Commands::Run { project_path, base_url, no_ai, config } => {
            cmd_run(&project_path, &base_url, no_ai, config.as_deref(), cli.format).await?
        }
        Commands::Visual { project_path, base_url, config } => {
            cmd_visual(&project_path, &base_url, config.as_deref(), cli.format).await?
        }
        Commands::Critique { project_path, config } => {
            cmd_critique(&project_path, config.as_deref()).await?
        }
        Commands::Baselines { project_path, update } => {
            cmd_baselines(&project_path, update.as_deref(), cli.format)?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => Ok(RunConfig::from_file(path)?),
        None => Ok(RunConfig::default()),
    }
}

/// Full pipeline: visual phase, optional critique phase, merged report.
async fn cmd_run(
    project_path: &Path,
    base_url: &str,
    no_ai: bool,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<i32> {
    let config = load_config(config_path)?;
    output::print_info(&format!("Hybrid visual testing at {base_url}"));

    let runner = VisualRunner::new(project_path, config.clone())?;
    let visual_report = runner.run(base_url).await?;
    output::print_page_results(&visual_report, format);

    let critique_report = if no_ai {
        None
    } else {
        // A failed critique phase degrades the report, it never aborts it
        match run_critique_phase(project_path, &config).await {
            Ok(report) => {
                output::print_critique_summary(&report);
                Some(report)
            }
            Err(e) => {
                output::print_warning(&format!("Critique phase failed: {e}"));
                output::print_warning("Continuing with automated results only");
                None
            }
        }
    };

    let verdict = report::verdict(&visual_report, critique_report.as_ref());
    let document = report::compose(&visual_report, critique_report.as_ref());
    let path = report::write_report(project_path, &document)?;

    output::print_success(&format!("Report written to {}", path.display()));
    output::print_verdict(verdict);
    Ok(report::exit_code(verdict))
}

/// Automated visual phase only.
async fn cmd_visual(
    project_path: &Path,
    base_url: &str,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<i32> {
    let config = load_config(config_path)?;

    let runner = VisualRunner::new(project_path, config)?;
    let visual_report = runner.run(base_url).await?;
    output::print_page_results(&visual_report, format);

    let verdict = report::verdict(&visual_report, None);
    output::print_verdict(verdict);
    Ok(report::exit_code(verdict))
}

/// Critique phase only, over screenshots from a previous run.
async fn cmd_critique(project_path: &Path, config_path: Option<&Path>) -> Result<i32> {
    let config = load_config(config_path)?;

    let report = run_critique_phase(project_path, &config).await?;
    output::print_critique_summary(&report);

    Ok(if report.summary.critical_issues > 0 { 1 } else { 0 })
}

async fn run_critique_phase(project_path: &Path, config: &RunConfig) -> Result<CritiqueReport> {
    let client = VisionClient::from_env(&config.model)?;
    let store = BaselineStore::new(project_path)?;

    let results = client
        .critique_pages(store.current_dir(), &config.candidate_pages)
        .await;
    let report = critique::aggregate(results);
    critique::write_report(project_path, &report)?;

    Ok(report)
}

/// List baselines or replace one from its current capture.
fn cmd_baselines(
    project_path: &Path,
    update: Option<&str>,
    format: OutputFormat,
) -> Result<i32> {
    let store = BaselineStore::new(project_path)?;

    if let Some(page_id) = update {
        store.update_baseline(page_id)?;
        output::print_success(&format!("Baseline updated for '{page_id}'"));
        return Ok(0);
    }

    let rows: Vec<output::BaselineRow> = store
        .list_baselines()?
        .into_iter()
        .map(|page| output::BaselineRow { page })
        .collect();
    output::print_list(&rows, format);

    Ok(0)
}
