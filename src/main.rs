use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use driftscan::diff::diff_snapshots;
use driftscan::filter::NoiseFilter;
use driftscan::model::Snapshot;
use driftscan::store::{default_snapshot_path, SnapshotStore};
use driftscan::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driftscan")]
#[command(
    author,
    version,
    about = "Inspect persisted inventory baselines and diff snapshot files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the persisted baseline snapshot as JSON
    Show {
        /// Snapshot file to read (defaults to the configured path)
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Diff two snapshot files and print the resulting change records
    Diff {
        /// Baseline snapshot file
        before: PathBuf,
        /// Current snapshot file
        after: PathBuf,

        /// Apply the configured noise rules to the output
        #[arg(long)]
        filtered: bool,
    },

    /// Print the resolved baseline snapshot path
    Path,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Show { state } => {
            let path = state
                .or_else(|| config.snapshot_path.clone())
                .unwrap_or_else(default_snapshot_path);
            let store = SnapshotStore::new(&path);
            match store.load()? {
                Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                None => eprintln!("no baseline at {}", path.display()),
            }
            Ok(())
        }
        Commands::Diff {
            before,
            after,
            filtered,
        } => {
            let baseline = read_snapshot(&before)?;
            let current = read_snapshot(&after)?;

            let mut changes = diff_snapshots(Utc::now(), &baseline, &current);
            if filtered {
                changes = NoiseFilter::with_rules(&config.ignore_rules()).apply(changes);
            }
            println!("{}", serde_json::to_string_pretty(&changes)?);
            Ok(())
        }
        Commands::Path => {
            let path = config
                .snapshot_path
                .clone()
                .unwrap_or_else(default_snapshot_path);
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn read_snapshot(path: &PathBuf) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read snapshot {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse snapshot {}", path.display()))
}
