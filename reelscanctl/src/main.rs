use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use reelscan_config::{ConfigLoad, ConfigLoader, ScannerConfig, ScannerConfigSource};
use reelscan_core::ScanReport;
use reelscan_model::{LibraryType, ScanStatus};
use reelscanctl::{ScanOptions, run_scan};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "reelscanctl",
    about = "Scan media libraries and report what changed since the last scan",
    version
)]
struct Cli {
    /// Scanner config file (TOML or JSON); overrides REELSCAN_CONFIG_PATH
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one library and classify files as new, changed, unchanged or deleted
    Scan {
        #[arg(long = "type", value_enum)]
        library_type: LibraryTypeArg,
        /// Content location; repeat for several roots
        #[arg(long = "path", required = true)]
        paths: Vec<PathBuf>,
        /// Ledger file; defaults to ledger.path from the config
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Override scan.max_concurrent_jobs
        #[arg(long)]
        jobs: Option<usize>,
        /// Do not write the ledger back
        #[arg(long)]
        dry_run: bool,
        /// List every path, not just totals
        #[arg(long)]
        list: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved configuration
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LibraryTypeArg {
    Movies,
    Series,
    Music,
    Photos,
}

impl From<LibraryTypeArg> for LibraryType {
    fn from(value: LibraryTypeArg) -> Self {
        match value {
            LibraryTypeArg::Movies => LibraryType::Movies,
            LibraryTypeArg::Series => LibraryType::Series,
            LibraryTypeArg::Music => LibraryType::Music,
            LibraryTypeArg::Photos => LibraryType::Photos,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &cli.env_file {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad {
        mut config,
        source,
        env_file_loaded,
    } = loader.load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }
    log_source(&source);

    match cli.command {
        Command::Scan {
            library_type,
            paths,
            ledger,
            jobs,
            dry_run,
            list,
            json,
        } => {
            if let Some(jobs) = jobs {
                config.scan.max_concurrent_jobs = jobs;
                config.validate()?;
            }
            let options = ScanOptions {
                library_type: library_type.into(),
                roots: paths,
                ledger_path: ledger.unwrap_or_else(|| config.ledger.path.clone()),
                config: config.scan.clone(),
                dry_run,
            };

            let outcome = run_scan(&options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            } else {
                print_report(&outcome.report, list);
                if outcome.ledger_written {
                    println!(
                        "ledger written to {}",
                        options.ledger_path.display()
                    );
                }
            }

            if outcome.report.status != ScanStatus::Completed {
                bail!(
                    "scan {} finished as {}",
                    outcome.report.scan_id,
                    outcome.report.status
                );
            }
            Ok(())
        }
        Command::Config { json } => print_config(&config, json),
    }
}

fn log_source(source: &ScannerConfigSource) {
    match source {
        ScannerConfigSource::Default => info!("using default scanner config"),
        ScannerConfigSource::Explicit(path) => {
            info!(path = %path.display(), "scanner config loaded from --config")
        }
        ScannerConfigSource::EnvPath(path) => {
            info!(path = %path.display(), "scanner config loaded from env path")
        }
        ScannerConfigSource::EnvInline => {
            info!("scanner config loaded from inline environment json")
        }
        ScannerConfigSource::File(path) => {
            info!(path = %path.display(), "scanner config loaded from file")
        }
    }
}

fn print_config(config: &ScannerConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", toml::to_string(config)?);
    }
    Ok(())
}

fn print_report(report: &ScanReport, list: bool) {
    println!("scan {} {}", report.scan_id, report.status);
    println!("  new        {}", report.counts.new);
    println!("  changed    {}", report.counts.changed);
    println!("  unchanged  {}", report.counts.unchanged);
    println!("  deleted    {}", report.counts.deleted);
    println!("  hashed     {}", report.files_hashed);

    if list {
        for (marker, paths) in [
            ('+', &report.new),
            ('~', &report.changed),
            ('-', &report.deleted),
            ('=', &report.unchanged),
        ] {
            for path in paths {
                println!("{marker} {path}");
            }
        }
    }
}
