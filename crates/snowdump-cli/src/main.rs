use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use snowdump_catalog::SnowflakeConnector;
use snowdump_core::{Config, DumpReport, DumpSettings, FailurePolicy};
use snowdump_engine::DumpRun;

/// Prefix of the scratch output folder used when `--output` is not given
const TEMP_FOLDER_PREFIX: &str = "snowflake_dumper";

/// snowdump - Dump Snowflake object definitions to a folder tree
#[derive(Parser)]
#[command(name = "snowdump")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "snowdump.toml")]
    config: PathBuf,

    /// Output root (default: a new temporary folder, kept after the run)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Upper bound on concurrently running database/schema tasks
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Record failures and keep dumping instead of stopping at the first one
    #[arg(long)]
    best_effort: bool,

    /// Write a JSON run report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Only dump these targets (repeatable; default: all)
    #[arg(short, long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    #[cfg(not(feature = "snowflake"))]
    tracing::warn!("Built without Snowflake support; every target will fail to connect");

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Cannot load config from {}", cli.config.display()))?;
    let settings = effective_settings(&config.dump, &cli)?;
    let targets = config.selected_targets(&cli.targets)?;

    let output_root = prepare_output_root(cli.output.as_deref())?;
    eprintln!("{} [{}]", "Output folder:".cyan(), output_root.display());

    let started = Instant::now();
    let run = DumpRun::new(Arc::new(SnowflakeConnector), &output_root, settings);
    let report = run.execute(&targets).await;

    print_summary(&report);
    eprintln!("{} {:.1?}", "Elapsed:".cyan(), started.elapsed());

    if let Some(path) = &cli.report {
        report
            .save_to_file(path)
            .with_context(|| format!("Cannot write report to {}", path.display()))?;
        eprintln!("{} {}", "Report saved to:".green(), path.display());
    }

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}

/// Config file settings with command-line overrides applied
fn effective_settings(base: &DumpSettings, cli: &Cli) -> Result<DumpSettings> {
    let mut settings = base.clone();

    if let Some(limit) = cli.max_concurrency {
        anyhow::ensure!(limit >= 1, "--max-concurrency must be at least 1");
        settings.max_concurrency = limit;
    }
    if cli.best_effort {
        settings.failure_policy = FailurePolicy::BestEffort;
    }

    Ok(settings)
}

fn prepare_output_root(output: Option<&Path>) -> Result<PathBuf> {
    match output {
        Some(path) => {
            std::fs::create_dir_all(path)
                .with_context(|| format!("Cannot create output folder {}", path.display()))?;
            Ok(path.to_path_buf())
        }
        None => {
            let dir = tempfile::Builder::new()
                .prefix(TEMP_FOLDER_PREFIX)
                .tempdir()
                .context("Cannot create temporary output folder")?;
            // Left on disk for the user to collect
            Ok(dir.keep())
        }
    }
}

fn print_summary(report: &DumpReport) {
    println!();
    println!("{}", "Dump Summary".bold());
    println!("{}", "=".repeat(50));

    for target in &report.targets {
        let status = if target.failures == 0 {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{} {} {}",
            status,
            target.name.bold(),
            target.output_folder.display().to_string().green()
        );
        println!(
            "    {} databases, {} schemas, {} objects",
            target.databases, target.schemas, target.objects_written
        );
        if target.duplicates > 0 {
            println!("    {} duplicate file names", target.duplicates.to_string().yellow());
        }
    }

    println!();
    if report.has_failures() {
        println!("  Failures: {}", report.failures.len().to_string().red().bold());
        for failure in &report.failures {
            let stage = failure
                .stage
                .map(|s| format!(" after {}", s))
                .unwrap_or_default();
            println!(
                "  {} {}{}: {}",
                "ERROR".red().bold(),
                failure.location,
                stage,
                failure.message
            );
        }
    } else {
        println!(
            "{} {} objects written",
            "✓".green().bold(),
            report.objects_written().to_string().green()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let cli = Cli::parse_from([
            "snowdump",
            "--max-concurrency",
            "2",
            "--best-effort",
            "-t",
            "prod",
            "--target",
            "dev",
        ]);
        assert_eq!(cli.targets, vec!["prod", "dev"]);

        let settings = effective_settings(&DumpSettings::default(), &cli).unwrap();
        assert_eq!(settings.max_concurrency, 2);
        assert_eq!(settings.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::parse_from(["snowdump", "--max-concurrency", "0"]);
        assert!(effective_settings(&DumpSettings::default(), &cli).is_err());
    }

    #[test]
    fn defaults_keep_config_settings() {
        let cli = Cli::parse_from(["snowdump"]);
        assert_eq!(cli.config, PathBuf::from("snowdump.toml"));
        assert_eq!(
            effective_settings(&DumpSettings::default(), &cli).unwrap(),
            DumpSettings::default()
        );
    }

    #[test]
    fn temp_output_root_is_prefixed_and_kept() {
        let root = prepare_output_root(None).unwrap();
        let name = root.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(TEMP_FOLDER_PREFIX));
        assert!(root.is_dir());
        std::fs::remove_dir_all(root).unwrap();
    }
}
