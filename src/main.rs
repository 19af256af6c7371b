//! trend-sieve binary entrypoint
//! One pipeline pass per invocation; scheduling is left to cron or CI.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_sieve::config::{Settings, Since};
use trend_sieve::metrics::Metrics;
use trend_sieve::shutdown::interrupted;
use trend_sieve::store::store_from_settings;
use trend_sieve::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "trend-sieve", version, about = "Collect, score and notify trending AI projects")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once (default).
    Run {
        /// Trending window; overrides GITHUB_SINCE.
        #[arg(short, long, value_enum)]
        since: Option<Since>,
        /// Trending language filter; overrides GITHUB_LANGUAGE.
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Print recently stored items as JSON.
    Recent {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

/// `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trend_sieve=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run(command: Command, mut settings: Settings, metrics: Option<&Metrics>) -> Result<()> {
    match command {
        Command::Run { since, lang } => {
            if let Some(since) = since {
                settings.github_since = since;
            }
            if let Some(lang) = lang.filter(|l| !l.trim().is_empty()) {
                settings.github_language = Some(lang);
            }
            let pipeline = Pipeline::from_settings(&settings)?;
            let report = pipeline.run_once().await;
            tracing::info!(novel = report.novel.len(), notified = report.notified, "done");

            if let (Some(path), Some(m)) = (&settings.metrics_textfile, metrics) {
                m.write_textfile(Path::new(path))?;
            }
        }
        Command::Recent { days, limit } => {
            let store = store_from_settings(&settings)?;
            if !store.is_configured() {
                tracing::warn!("no store configured; nothing to list");
            }
            let rows = store.recent_items(days, limit).await?;
            let out = serde_json::to_string_pretty(&rows).context("serializing recent items")?;
            println!("{out}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run { since: None, lang: None });

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = ?e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics recorder not installed");
            None
        }
    };

    tokio::select! {
        res = run(command, settings, metrics.as_ref()) => match res {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = ?e, "run failed");
                ExitCode::FAILURE
            }
        },
        _ = interrupted(tokio::signal::ctrl_c()) => {
            tracing::info!("interrupted, exiting");
            ExitCode::SUCCESS
        }
    }
}
