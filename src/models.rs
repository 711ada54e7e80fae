//! Data models for articles flowing through the pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourceDescriptor`]: A configured news source (name + landing page)
//! - [`ArticleRecord`]: One article as it moves from ingestion to the newsletter
//!
//! Records are created by ingestion and enriched in place: condensation fills
//! [`ArticleRecord::summary`], tone transformation fills
//! [`ArticleRecord::stylized_content`]. Both start out as `None` so that
//! "not yet processed" never needs a sentinel string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news source to collect articles from.
///
/// Sources are read-only configuration; ingestion never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDescriptor {
    /// Human readable name, copied into every record from this source.
    pub name: String,
    /// Landing page whose links are treated as candidate articles.
    pub url: String,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// The built-in list of AI news landing pages used when no sources file is given.
pub fn default_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::new(
            "Analytics Insight",
            "https://www.analyticsinsight.net/category/artificial-intelligence/",
        ),
        SourceDescriptor::new("AI Magazine", "https://aimagazine.com/latest-news"),
        SourceDescriptor::new("DevX", "https://www.devx.com/category/ai/"),
        SourceDescriptor::new(
            "MIT News",
            "https://news.mit.edu/topic/artificial-intelligence2",
        ),
        SourceDescriptor::new(
            "Science Daily",
            "https://www.sciencedaily.com/news/computers_math/artificial_intelligence/",
        ),
        SourceDescriptor::new("Google AI Blog", "https://ai.google/latest-news/"),
        SourceDescriptor::new(
            "TechCrunch AI",
            "https://techcrunch.com/category/artificial-intelligence/",
        ),
    ]
}

/// A single article and everything the pipeline has learned about it.
///
/// # Invariants
///
/// - `title` and `text` are non-empty: extraction discards anything else.
/// - `url` is unique within a run (first occurrence wins).
/// - `published_at` is always set, falling back to the extraction time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The article headline.
    pub title: String,
    /// The extracted body text.
    pub text: String,
    /// Absolute URL the article was downloaded from.
    pub url: String,
    /// Name of the [`SourceDescriptor`] that linked to this article.
    pub source: String,
    /// Publish time found on the page, or the time of extraction.
    pub published_at: DateTime<Utc>,
    /// Short summary, set by the condensation stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Humorous rewrite of title and summary, set by the tone stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylized_content: Option<String>,
}

impl ArticleRecord {
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            url: url.into(),
            source: source.into(),
            published_at,
            summary: None,
            stylized_content: None,
        }
    }

    /// True once both enrichment stages have run and produced content.
    pub fn is_complete(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.is_empty())
            && self
                .stylized_content
                .as_deref()
                .is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord::new(
            "Test Article",
            "Body text",
            "https://example.com/article",
            "Example",
            Utc::now(),
        )
    }

    #[test]
    fn test_new_record_is_unprocessed() {
        let r = record();
        assert!(r.summary.is_none());
        assert!(r.stylized_content.is_none());
        assert!(!r.is_complete());
    }

    #[test]
    fn test_is_complete_requires_both_fields() {
        let mut r = record();
        r.summary = Some("Summary".to_string());
        assert!(!r.is_complete());
        r.stylized_content = Some(String::new());
        assert!(!r.is_complete());
        r.stylized_content = Some("Funny".to_string());
        assert!(r.is_complete());
    }

    #[test]
    fn test_unprocessed_fields_are_omitted_from_json() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains("\"title\":\"Test Article\""));
        assert!(!json.contains("summary"));
        assert!(!json.contains("stylized_content"));
    }

    #[test]
    fn test_sources_deserialize_from_yaml() {
        let yaml = "- name: MIT News\n  url: https://news.mit.edu/\n- name: DevX\n  url: https://www.devx.com/\n";
        let sources: Vec<SourceDescriptor> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0], SourceDescriptor::new("MIT News", "https://news.mit.edu/"));
    }

    #[test]
    fn test_default_sources() {
        let sources = default_sources();
        assert_eq!(sources.len(), 7);
        assert!(sources.iter().all(|s| s.url.starts_with("https://")));
    }
}
