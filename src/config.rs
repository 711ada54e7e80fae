//! Validated runtime settings.
//!
//! [`Settings`] is built once from the parsed [`Cli`] and then handed to each
//! component constructor by reference. Invalid values never abort a run: they
//! are replaced by their defaults and a warning is logged.

use crate::cli::Cli;
use crate::error::Result;
use crate::models::{SourceDescriptor, default_sources};
use crate::outputs::OutputFormat;
use std::fmt;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument, warn};

const DEFAULT_MAX_ARTICLES: usize = 5;
const DEFAULT_DAYS_BACK: u32 = 3;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SUMMARY_MIN: usize = 50;
const DEFAULT_SUMMARY_MAX: usize = 150;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 500;
/// Tone requests are not retried unless asked for.
const DEFAULT_MAX_RETRIES: usize = 0;

#[derive(Clone)]
pub struct Settings {
    pub max_articles_per_source: usize,
    pub days_to_look_back: u32,
    pub fetch_timeout: Duration,
    pub summarization_model: String,
    pub summary_min_length: usize,
    pub summary_max_length: usize,
    pub hf_api_token: Option<String>,
    pub humor_model: String,
    pub humor_temperature: f32,
    pub humor_max_tokens: u32,
    pub humor_max_retries: usize,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub output_format: OutputFormat,
    pub output_directory: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_articles_per_source: DEFAULT_MAX_ARTICLES,
            days_to_look_back: DEFAULT_DAYS_BACK,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            summarization_model: "google/pegasus-cnn_dailymail".to_string(),
            summary_min_length: DEFAULT_SUMMARY_MIN,
            summary_max_length: DEFAULT_SUMMARY_MAX,
            hf_api_token: None,
            humor_model: "gpt-4".to_string(),
            humor_temperature: DEFAULT_TEMPERATURE,
            humor_max_tokens: DEFAULT_MAX_TOKENS,
            humor_max_retries: DEFAULT_MAX_RETRIES,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            output_format: OutputFormat::Markdown,
            output_directory: "./output".to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("max_articles_per_source", &self.max_articles_per_source)
            .field("days_to_look_back", &self.days_to_look_back)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("summarization_model", &self.summarization_model)
            .field("summary_min_length", &self.summary_min_length)
            .field("summary_max_length", &self.summary_max_length)
            .field("hf_api_token", &self.hf_api_token.as_ref().map(|_| "<redacted>"))
            .field("humor_model", &self.humor_model)
            .field("humor_temperature", &self.humor_temperature)
            .field("humor_max_tokens", &self.humor_max_tokens)
            .field("humor_max_retries", &self.humor_max_retries)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_base_url", &self.openai_base_url)
            .field("output_format", &self.output_format)
            .field("output_directory", &self.output_directory)
            .finish()
    }
}

/// A positive value that fits the target type, or `default` with a warning.
fn positive<T: TryFrom<i64> + fmt::Debug>(key: &str, value: i64, default: T) -> T {
    match T::try_from(value) {
        Ok(v) if value > 0 => v,
        _ => {
            warn!(key, value, ?default, "Invalid value; using default instead");
            default
        }
    }
}

/// Blank credentials count as missing.
fn credential(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Settings {
    /// Validate CLI/environment values into settings.
    pub fn from_cli(cli: &Cli) -> Self {
        let max_articles_per_source = positive(
            "max_articles_per_source",
            cli.max_articles_per_source,
            DEFAULT_MAX_ARTICLES,
        );
        let days_to_look_back =
            positive("days_to_look_back", cli.days_to_look_back, DEFAULT_DAYS_BACK);
        let fetch_timeout = Duration::from_secs(positive(
            "fetch_timeout_secs",
            cli.fetch_timeout_secs,
            DEFAULT_FETCH_TIMEOUT_SECS,
        ));
        let mut summary_min_length = positive(
            "summary_min_length",
            cli.summary_min_length,
            DEFAULT_SUMMARY_MIN,
        );
        let summary_max_length = positive(
            "summary_max_length",
            cli.summary_max_length,
            DEFAULT_SUMMARY_MAX,
        );
        if summary_min_length > summary_max_length {
            warn!(
                summary_min_length,
                summary_max_length, "summary_min_length exceeds summary_max_length; clamping"
            );
            summary_min_length = summary_max_length;
        }

        let humor_temperature = if (0.0..=1.0).contains(&cli.humor_temperature) {
            cli.humor_temperature
        } else {
            warn!(
                value = cli.humor_temperature,
                default = DEFAULT_TEMPERATURE,
                "Invalid value for humor_temperature; using default instead"
            );
            DEFAULT_TEMPERATURE
        };
        let humor_max_tokens =
            positive("humor_max_tokens", cli.humor_max_tokens, DEFAULT_MAX_TOKENS);
        let humor_max_retries = usize::try_from(cli.humor_max_retries).unwrap_or_else(|_| {
            warn!(value = cli.humor_max_retries, "Negative humor_max_retries; using 0");
            0
        });

        let output_format = cli.output_format.parse().unwrap_or_else(|_| {
            warn!(
                value = %cli.output_format,
                "Invalid value for output_format; using markdown instead"
            );
            OutputFormat::Markdown
        });

        Self {
            max_articles_per_source,
            days_to_look_back,
            fetch_timeout,
            summarization_model: cli.summarization_model.clone(),
            summary_min_length,
            summary_max_length,
            hf_api_token: credential(&cli.hf_api_token),
            humor_model: cli.humor_model.clone(),
            humor_temperature,
            humor_max_tokens,
            humor_max_retries,
            openai_api_key: credential(&cli.openai_api_key),
            openai_base_url: cli.openai_base_url.clone(),
            output_format,
            output_directory: cli.output_directory.clone(),
        }
    }
}

/// Load the sources to collect from.
///
/// With no path the built-in AI news sources are used. A file must contain a
/// YAML sequence of `{name, url}` mappings.
#[instrument(level = "info")]
pub async fn load_sources(path: Option<&str>) -> Result<Vec<SourceDescriptor>> {
    let Some(path) = path else {
        let sources = default_sources();
        info!(count = sources.len(), "Using built-in sources");
        return Ok(sources);
    };

    let yaml = fs::read_to_string(path).await?;
    let sources: Vec<SourceDescriptor> = serde_yaml::from_str(&yaml)?;
    if sources.is_empty() {
        warn!(path, "Sources file lists no sources");
    }
    info!(path, count = sources.len(), "Loaded sources");
    Ok(sources)
}
