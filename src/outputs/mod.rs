//! Newsletter rendering and persistence.
//!
//! This module turns the fully processed records into a single newsletter
//! document and writes it to the output directory:
//!
//! # Submodules
//!
//! - [`markdown`]: Markdown newsletter for reading or static-site publishing
//! - [`html`]: Standalone HTML page with inline styling
//! - [`json`]: Machine-readable dump of every record
//!
//! # Output Structure
//!
//! ```text
//! output_directory/
//! ├── ai_news_2025-05-06.md
//! ├── ai_news_2025-05-07.html
//! └── ai_news_2025-05-08.json
//! ```

pub mod html;
pub mod json;
pub mod markdown;

use crate::error::Result;
use crate::models::ArticleRecord;
use crate::utils::ensure_writable_dir;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs;
use tracing::{info, instrument};

/// Title shared by every rendered newsletter.
pub(crate) const NEWSLETTER_TITLE: &str = "AI News with a Twist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Html,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unsupported output format: {other}")),
        }
    }
}

/// Render `articles` in the requested format.
pub fn render(
    format: OutputFormat,
    articles: &[ArticleRecord],
    generated_at: DateTime<Local>,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Markdown => markdown::render(articles, generated_at),
        OutputFormat::Html => html::render(articles, generated_at),
        OutputFormat::Json => json::render(articles, generated_at)?,
    })
}

/// Render the newsletter and save it as `ai_news_{date}.{ext}`.
///
/// The output directory is created (and probed for writability) first.
/// Returns the path of the written file.
#[instrument(level = "info", skip_all, fields(%output_directory, ?format, count = articles.len()))]
pub async fn write_newsletter(
    output_directory: &str,
    format: OutputFormat,
    articles: &[ArticleRecord],
) -> Result<PathBuf> {
    ensure_writable_dir(output_directory).await?;

    let now = Local::now();
    let content = render(format, articles, now)?;
    let filename = format!("ai_news_{}.{}", now.format("%Y-%m-%d"), format.extension());
    let path = PathBuf::from(output_directory).join(filename);

    fs::write(&path, content).await?;
    info!(path = %path.display(), "Newsletter saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article() -> ArticleRecord {
        let mut a = ArticleRecord::new(
            "Robots Learn to Laugh",
            "Body",
            "https://example.com/robots",
            "Example News",
            Utc::now(),
        );
        a.summary = Some("Robots laughed.".to_string());
        a.stylized_content = Some("Robots laughed, then rebooted.".to_string());
        a
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("HTML".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert_eq!(" json ".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[tokio::test]
    async fn test_write_newsletter_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");
        let out = out.to_str().unwrap();

        let path = write_newsletter(out, OutputFormat::Markdown, &[article()])
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("ai_news_"));
        assert!(name.ends_with(".md"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("## Robots Learn to Laugh"));
    }

    #[tokio::test]
    async fn test_write_newsletter_html_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_newsletter(dir.path().to_str().unwrap(), OutputFormat::Html, &[article()])
            .await
            .unwrap();
        assert_eq!(path.extension().unwrap(), "html");
    }
}
