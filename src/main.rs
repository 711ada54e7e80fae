//! # News Summarizer
//!
//! Collects recent AI news from a list of sources, condenses each article into
//! a short summary and rewrites the summaries in a humorous voice, then writes
//! the day's newsletter as Markdown, HTML or JSON.
//!
//! ## Usage
//!
//! ```sh
//! news_summarizer --sources sources.yaml -o ./output --output-format html
//! ```
//!
//! Every option can also be set through the environment (or a `.env` file).
//!
//! ## Architecture
//!
//! 1. **Ingestion**: discover article links on each source and extract them
//! 2. **Condensation**: summarize every article with a seq2seq model, or a
//!    local extractive pipeline if the model cannot be loaded
//! 3. **Stylization**: rewrite each summary through a chat-completion API,
//!    passing it through unchanged when no API key is configured
//! 4. **Output**: render and save the newsletter

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod humor;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod summarize;
mod utils;

use cli::Cli;
use config::{Settings, load_sources};
use humor::ToneTransformer;
use pipeline::{Pipeline, RunOutcome};
use scrapers::HttpFetcher;
use summarize::hub::HubModelLoader;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    match cli::env_file_arg(std::env::args_os().filter_map(|a| a.into_string().ok())) {
        Some(path) => {
            if let Err(e) = dotenv::from_filename(&path) {
                error!(%path, error = %e, "Could not load env file");
                return ExitCode::FAILURE;
            }
        }
        // A missing .env file is the normal case.
        None => {
            dotenv::dotenv().ok();
        }
    }

    let start_time = std::time::Instant::now();
    info!("news_summarizer starting up");

    let args = Cli::parse();
    let settings = Settings::from_cli(&args);
    debug!(?settings, "Resolved settings");

    let code = match run(&args, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "News summarizer failed");
            ExitCode::FAILURE
        }
    };

    info!(
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "news_summarizer finished"
    );
    code
}

#[instrument(level = "info", skip_all)]
async fn run(args: &Cli, settings: Settings) -> error::Result<()> {
    let sources = load_sources(args.sources.as_deref()).await?;

    let fetcher = HttpFetcher::new(settings.fetch_timeout)?;
    let loader = HubModelLoader::new(&settings)?;
    let tone = ToneTransformer::from_settings(&settings);
    let output_directory = settings.output_directory.clone();
    let output_format = settings.output_format;

    let pipeline = Pipeline::new(sources, fetcher, loader, tone, settings);
    let articles = match pipeline.run().await? {
        RunOutcome::Completed(articles) => articles,
        RunOutcome::Aborted { reason } => {
            return Err(error::Error::Aborted(reason));
        }
    };

    let path = outputs::write_newsletter(&output_directory, output_format, &articles).await?;
    info!(
        path = %path.display(),
        articles = articles.len(),
        format = ?output_format,
        "Run complete"
    );
    Ok(())
}
