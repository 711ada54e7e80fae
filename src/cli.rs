//! Command-line interface definitions for the news summarizer.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be provided through an environment variable (or a
//! `.env` file in the working directory, or the file named by `--env-file`). Values are validated afterwards by
//! [`crate::config::Settings::from_cli`].

use clap::Parser;

/// Command-line arguments for the news summarizer.
///
/// Numeric options are parsed as signed integers on purpose: out-of-range
/// values are replaced by their defaults with a warning instead of aborting.
///
/// # Examples
///
/// ```sh
/// # Defaults, with credentials from the environment
/// news_summarizer
///
/// # Custom sources and HTML output
/// news_summarizer --sources sources.yaml --output-format html -o ./out
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Load environment variables from this file instead of `./.env`
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<String>,

    /// YAML file listing the sources to collect from (`- name: ..., url: ...`)
    #[arg(short, long)]
    pub sources: Option<String>,

    /// Maximum number of links followed per source
    #[arg(long, env = "MAX_ARTICLES_PER_SOURCE", default_value_t = 5)]
    pub max_articles_per_source: i64,

    /// Only keep articles published within this many days
    #[arg(long, env = "DAYS_TO_LOOK_BACK", default_value_t = 3)]
    pub days_to_look_back: i64,

    /// Seconds to wait for a single page download
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: i64,

    /// Summarization model identifier on the Hugging Face Hub
    #[arg(long, env = "SUMMARIZATION_MODEL", default_value = "google/pegasus-cnn_dailymail")]
    pub summarization_model: String,

    /// Minimum summary length
    #[arg(long, env = "SUMMARY_MIN_LENGTH", default_value_t = 50)]
    pub summary_min_length: i64,

    /// Maximum summary length
    #[arg(long, env = "SUMMARY_MAX_LENGTH", default_value_t = 150)]
    pub summary_max_length: i64,

    /// Hugging Face access token used for model lookup and inference
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_api_token: Option<String>,

    /// Chat model used for the humorous rewrite
    #[arg(long, env = "HUMOR_MODEL", default_value = "gpt-4")]
    pub humor_model: String,

    /// Sampling temperature for the humorous rewrite (0.0 - 1.0)
    #[arg(long, env = "HUMOR_TEMPERATURE", default_value_t = 0.7)]
    pub humor_temperature: f32,

    /// Maximum tokens generated per humorous rewrite
    #[arg(long, env = "HUMOR_MAX_TOKENS", default_value_t = 500)]
    pub humor_max_tokens: i64,

    /// Retries for a failed humorous rewrite before passing the summary
    /// through (default: a single request)
    #[arg(long, env = "HUMOR_MAX_RETRIES", default_value_t = 0)]
    pub humor_max_retries: i64,

    /// OpenAI API key; without it summaries are passed through unchanged
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Newsletter format: markdown, html or json
    #[arg(long, env = "OUTPUT_FORMAT", default_value = "markdown")]
    pub output_format: String,

    /// Directory the newsletter is written to
    #[arg(short, long, env = "OUTPUT_DIRECTORY", default_value = "./output")]
    pub output_directory: String,
}

/// Find `--env-file PATH` or `--env-file=PATH` in raw arguments.
///
/// The file has to be loaded before [`Cli::parse`] reads `env` fallbacks, so
/// this runs on the arguments ahead of clap. The last occurrence wins.
pub fn env_file_arg<I>(args: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let mut found = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            found = args.next();
        } else if let Some(path) = arg.strip_prefix("--env-file=") {
            found = Some(path.to_string());
        }
    }
    found
}
