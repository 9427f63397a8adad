// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::EnvFilter;

use pullwatch::{
    decode_stream, explain_pull_error, Config, LayerId, LayerState, PullSession, PullSummary,
};

mod render;

use render::{format_bytes, LayerBars};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process exit codes
mod exit_codes {
    /// Pull failed or the stream was unreadable
    pub const ERROR: i32 = 1;
}

/// pullwatch - per-layer progress for container image pulls.
#[derive(Parser)]
#[command(name = "pullwatch")]
#[command(version = VERSION)]
#[command(about = "Per-layer progress for container image pulls.")]
#[command(long_about = "pullwatch - per-layer progress for container image pulls\n\n\
    Replay a capture:    pullwatch replay pull.ndjson\n\
    Read from stdin:     pullwatch replay - < pull.ndjson\n\
    Show config:         pullwatch config show")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose mode: debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a newline-delimited JSON pull stream
    ///
    /// Examples:
    ///   pullwatch replay pull.ndjson
    ///   pullwatch replay - --image alpine:latest < pull.ndjson
    ///   pullwatch replay pull.ndjson --json
    Replay {
        /// Stream file, or "-" for stdin
        input: PathBuf,
        /// Image reference used in messages (defaults to the input name)
        #[arg(long)]
        image: Option<String>,
        /// Print the final layer states as JSON instead of progress bars
        #[arg(long)]
        json: bool,
        /// No progress bars, only the result line
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current settings
    Show,
    /// Print the config file location
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Bars,
    Quiet,
    Json,
}

#[derive(Serialize)]
struct LayerReport {
    id: LayerId,
    #[serde(flatten)]
    state: LayerState,
}

#[derive(Serialize)]
struct PullReport {
    image: String,
    image_id: Option<LayerId>,
    error: Option<String>,
    summary: PullSummary,
    layers: Vec<LayerReport>,
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "pullwatch=debug" } else { "pullwatch=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_input(input: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = std::fs::File::open(input)
        .with_context(|| format!("Failed to open pull stream {}", input.display()))?;
    Ok(Box::new(BufReader::new(tokio::fs::File::from_std(file))))
}

async fn replay(input: PathBuf, image: Option<String>, mode: OutputMode, config: &Config) -> Result<bool> {
    let reader = open_input(&input)?;
    let image = image.unwrap_or_else(|| input.display().to_string());

    let mut session = PullSession::new(image.clone());
    let status = session.status();

    tracing::debug!(image = %image, input = %input.display(), "replaying pull stream");

    let mut worker = tokio::spawn(async move {
        let result = session.consume_stream(decode_stream(reader)).await;
        (session, result)
    });

    let joined = if mode == OutputMode::Bars {
        let mut bars = LayerBars::new(config.show_completed);
        let mut ticker = tokio::time::interval(config.refresh_interval());

        let joined = loop {
            tokio::select! {
                joined = &mut worker => break joined,
                _ = ticker.tick() => bars.update(&status.snapshot()),
            }
        };

        bars.update(&status.snapshot());
        bars.finish();
        joined
    } else {
        worker.await
    };

    let (session, result) = joined.context("Pull worker task failed")?;

    if mode == OutputMode::Json {
        let report = PullReport {
            image: session.image().to_string(),
            image_id: status.image_id(),
            error: result.as_ref().err().map(|e| e.to_string()),
            summary: status.summary(),
            layers: status
                .snapshot()
                .into_iter()
                .map(|(id, state)| LayerReport { id, state })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(result.is_ok());
    }

    match result {
        Ok(()) => {
            let summary = status.summary();
            println!(
                "{} Pulled {}: {} layers, {} in {:.1}s",
                "[✓]".green(),
                session.image().bold(),
                summary.layers,
                format_bytes(summary.bytes_total),
                session.elapsed().num_milliseconds() as f64 / 1000.0
            );
            Ok(true)
        }
        Err(err) => {
            eprintln!("{}", explain_pull_error(&err).build().red());
            Ok(false)
        }
    }
}

fn handle_config(command: Option<ConfigCommands>, config: &Config) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", "=== pullwatch configuration ===".bright_cyan().bold());
            println!();
            println!("  Refresh interval: {} ms", config.refresh_interval_ms);
            println!("  Show completed:   {}", config.show_completed);
            println!("  Color:            {}", config.color);
            println!();
            println!("Config file: {}", Config::path()?.display());
            println!();
        }
        Some(ConfigCommands::Path) => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load()?;
    if !config.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Replay { input, image, json, quiet } => {
            let mode = if json {
                OutputMode::Json
            } else if quiet {
                OutputMode::Quiet
            } else {
                OutputMode::Bars
            };

            let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
            let succeeded = runtime.block_on(replay(input, image, mode, &config))?;
            if !succeeded {
                std::process::exit(exit_codes::ERROR);
            }
        }
        Commands::Config { command } => {
            handle_config(command, &config)?;
        }
    }

    Ok(())
}
