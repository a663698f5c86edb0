mod analysis;
mod config;
mod gaps;
mod metrics;
mod parser;
mod slots;
mod stats;
mod web;
mod windows;

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::Analyzer;
use crate::config::NetworkSettings;
use crate::web::{start_web_server, AppState};

#[derive(Parser)]
#[command(name = "network-uptime-analyzer")]
#[command(about = "Outage and uptime analysis for periodic public-IP check logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a check log and print an uptime report
    Analyze {
        /// Path to the check log (overrides log_file in the config)
        #[arg(short, long)]
        log_file: Option<PathBuf>,

        /// YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Analyze as of this instant (RFC 3339) instead of the current time
        #[arg(long)]
        now: Option<String>,

        /// Print the full analysis as JSON instead of the text report
        #[arg(long, default_value = "false")]
        json: bool,

        /// List every gap instead of the configured maximum
        #[arg(long, default_value = "false")]
        all_gaps: bool,

        /// Also save the output to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Serve the analysis over HTTP
    Serve {
        /// Port for the API
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// YAML settings file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the check log (overrides log_file in the config)
        #[arg(short, long)]
        log_file: Option<PathBuf>,

        /// Path to store log files
        #[arg(long, default_value = "logs")]
        log_dir: PathBuf,
    },
}

fn load_settings(config: Option<PathBuf>, log_file: Option<PathBuf>) -> anyhow::Result<NetworkSettings> {
    let mut settings = match config {
        Some(path) => NetworkSettings::load(&path)?,
        None => NetworkSettings::default(),
    };
    if log_file.is_some() {
        settings.log_file = log_file;
    }
    Ok(settings)
}

fn parse_now(now: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match now {
        Some(value) => Ok(DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("invalid --now timestamp {:?}", value))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            log_file,
            config,
            now,
            json,
            all_gaps,
            output,
        } => {
            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();

            let settings = load_settings(config, log_file)?;
            let now = parse_now(now.as_deref())?;
            let analyzer = Analyzer::new(Local, settings.uptime.windows.clone());

            let text = match settings.log_file.as_ref() {
                Some(path) => match std::fs::read_to_string(path) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Unable to load log {}: {}", path.display(), e);
                        String::new()
                    }
                },
                None => {
                    warn!("No log file configured");
                    String::new()
                }
            };

            let result = analyzer.analyze_text(&text, now);
            let rendered = if json {
                serde_json::to_string_pretty(&result)?
            } else {
                analysis::generate_report(&result, &settings, analyzer.timezone(), all_gaps)
            };

            println!("{}", rendered);
            if let Some(output) = output {
                std::fs::write(&output, &rendered)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                info!("Report saved to {:?}", output);
            }
            Ok(())
        }
        Commands::Serve {
            port,
            config,
            log_file,
            log_dir,
        } => {
            // Set up logging
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = RollingFileAppender::new(Rotation::HOURLY, &log_dir, "network-uptime.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
                .with(fmt::layer().with_writer(std::io::stdout))
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();

            let settings = load_settings(config, log_file)?;
            info!("Starting Network Uptime Analyzer");
            match settings.log_file.as_ref() {
                Some(path) => info!("Check log: {:?}", path),
                None => warn!("No log file configured; analysis will be empty"),
            }
            let state = Arc::new(AppState {
                analyzer: Analyzer::new(Local, settings.uptime.windows.clone()),
                settings,
            });
            info!("Uptime windows: {:?}", state.analyzer.windows());
            info!("API: http://localhost:{}/api/network/analysis", port);

            tokio::select! {
                result = start_web_server(state, port) => result?,
                _ = tokio::signal::ctrl_c() => info!("Shutting down..."),
            }

            Ok(())
        }
    }
}
