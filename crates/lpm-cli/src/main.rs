use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod journal;

#[derive(Parser)]
#[command(name = "lpm")]
#[command(about = "Local position manager tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve layered config and print the settings hash, the resolved
    /// settings as canonical JSON, and any keys nothing reads
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Replay a JSONL journal of gateway events through the position manager
    /// and print the resulting positions as JSON.
    Replay {
        /// One gateway event per line
        #[arg(long)]
        journal: PathBuf,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Fail instead of warning when the config has keys nothing reads
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = lpm_config::load_files(&paths)?;
            println!("settings_hash={}", loaded.settings_hash);
            println!("{}", loaded.canonical_json);
            for key in &loaded.unused_keys {
                println!("unused={key}");
            }
        }

        Commands::Replay {
            journal,
            config_paths,
            strict_config,
        } => {
            let settings = commands::load_settings(&config_paths, strict_config)?;
            let summary = commands::replay::run(&journal, &settings).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
