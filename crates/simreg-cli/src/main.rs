//! simreg: regression tests for the GAMER simulation code
//!
//! Discovers the test definitions under the source tree, builds and runs the
//! simulator for every selected case, compares the outputs with their
//! references and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use simreg_cli::exit::{EXIT_SETUP_FAILED, EXIT_SUCCESS};
use simreg_cli::logging::init_logging;
use simreg_cli::{RunLoop, StdinConfirmation, exit_code, offer_upload, print_summary};
use simreg_common::{ConfigBuilder, HarnessConfig, Priority};
use simreg_explorer::TestExplorer;
use simreg_reference::{ReferenceDispatcher, ReferenceProvider};
use simreg_runner::SimulatorStages;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const CONFIG_FILE: &str = "simreg.toml";

/// Regression tests for GAMER
#[derive(Parser, Debug)]
#[command(name = "simreg")]
#[command(version)]
#[command(about = "Build, run and compare GAMER regression tests")]
#[command(after_help = "Arguments after `--` are passed to configure.py verbatim.")]
struct Cli {
    /// Tolerance level used for comparison (e.g. level0, level1)
    #[arg(short = 'e', long = "error-level", value_name = "LEVEL")]
    error_level: Option<String>,

    /// Lowest priority to run (high, medium, low)
    #[arg(short, long, value_name = "PRIORITY")]
    priority: Option<Priority>,

    /// Test problem indices to run (see --list)
    #[arg(short = 'n', long = "name", value_name = "IDX", num_args = 1..)]
    names: Vec<usize>,

    /// Test type indices to run (see --list)
    #[arg(short = 't', long = "type", value_name = "IDX", num_args = 1..)]
    types: Vec<usize>,

    /// Basename of the log file (`<OUTPUT>.log`)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<String>,

    /// Never offer to publish failing results as new references
    #[arg(short = 'u', long)]
    no_upload: bool,

    /// Machine profile under configs/
    #[arg(short, long, value_name = "MACHINE")]
    machine: Option<String>,

    /// MPI ranks per socket
    #[arg(long = "mpi-rank", value_name = "N")]
    mpi_rank: Option<usize>,

    /// Cores per MPI rank
    #[arg(long = "mpi-core-per-rank", value_name = "N")]
    mpi_core_per_rank: Option<usize>,

    /// Configuration file (default: <source-root>/simreg.toml when present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// GAMER checkout to test
    #[arg(long, value_name = "PATH")]
    source_root: Option<PathBuf>,

    /// Console log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print the problem/type index table and exit
    #[arg(long)]
    list: bool,

    /// Extra configure.py arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    forced_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            let mut source = e.source();
            while let Some(err) = source {
                eprintln!("  Caused by: {err}");
                source = err.source();
            }
            EXIT_SETUP_FAILED
        }
    };
    std::process::exit(code);
}

fn load_configuration(cli: &Cli) -> Result<HarnessConfig> {
    let root = cli.source_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let file = cli.config.clone().or_else(|| Some(root.join(CONFIG_FILE)).filter(|p| p.is_file()));
    let builder = match &file {
        Some(path) => ConfigBuilder::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ConfigBuilder::new(),
    };

    builder
        .source_root(cli.source_root.clone())
        .error_level(cli.error_level.clone())
        .priority(cli.priority)
        .names(cli.names.clone())
        .types(cli.types.clone())
        .output(cli.output.clone())
        .log_level(cli.log_level.clone())
        .no_upload(cli.no_upload)
        .machine(cli.machine.clone())
        .mpi_ranks(cli.mpi_rank)
        .mpi_cores_per_rank(cli.mpi_core_per_rank)
        .forced_args(cli.forced_args.clone())
        .build()
        .context("Failed to build configuration")
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Arc::new(load_configuration(&cli)?);
    let explorer = TestExplorer::discover(&config.paths.tests_root)
        .context("Failed to load test definitions")?;

    if cli.list {
        print!("{}", explorer.index_table());
        return Ok(EXIT_SUCCESS);
    }

    let _log_guard = init_logging(&config.logging)?;
    record_version(&config).await;
    record_settings(&config);

    let cases = explorer.select(&config.selection).context("Invalid test selection")?;
    let ids: Vec<String> = cases.iter().map(|c| c.test_id()).collect();
    info!("Test to be run       : {}", ids.join(" "));

    let provider: Arc<dyn ReferenceProvider> = Arc::new(ReferenceDispatcher::from_config(&config));
    let stages = SimulatorStages::new(Arc::clone(&config));
    let run_loop = RunLoop::new(Arc::clone(&config), stages, Arc::clone(&provider));
    let report = run_loop.run(&cases).await;

    print_summary(&report, &config.logging.log_file());

    let mut port = StdinConfirmation::stdin();
    let upload = offer_upload(&report, &cases, &config, provider.as_ref(), &mut port).await?;
    info!("Upload: {upload:?}");
    Ok(exit_code(&report, &upload))
}

/// Log the simulator checkout's commit, `UNKNOWN` when git cannot tell
async fn record_version(config: &HarnessConfig) {
    let commit =
        git_head(&config.paths.source_root).await.unwrap_or_else(|| "UNKNOWN".to_string());
    info!("Recording the commit version.");
    info!("GAMER      version   : {commit}");
}

async fn git_head(root: &Path) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(root)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!head.is_empty()).then_some(head)
}

fn record_settings(config: &HarnessConfig) {
    info!("Record all arguments have been set.");
    match toml::to_string_pretty(config) {
        Ok(text) => {
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                info!("{line}");
            }
        }
        Err(e) => warn!("Cannot render settings: {e}"),
    }
}
