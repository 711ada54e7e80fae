//! Source ingestion: link discovery, article extraction and the ingestion engine.
//!
//! Ingestion follows the same two-phase pattern for every configured source:
//!
//! 1. **Indexing**: download the source's landing page and discover candidate
//!    article links ([`index::discover_links`])
//! 2. **Fetching**: download each candidate and extract title, body and publish
//!    time ([`article::extract`])
//!
//! [`ingest::Ingestor`] runs both phases for every source, merges the results,
//! drops duplicate URLs and filters out stale articles.
//!
//! # Common Patterns
//!
//! - All network access goes through [`PageFetcher`], so tests run offline
//! - Failures are logged and skipped at the smallest scope (source or link)
//! - Nothing here is source-specific: no per-site selectors

pub mod article;
pub mod index;
pub mod ingest;

use crate::error::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Desktop browser User-Agent; several news sites refuse obvious bots.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Something that can download a page as text.
pub trait PageFetcher {
    /// Download `url` and return the response body.
    ///
    /// A non-success status or a timeout is an error; callers never retry.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("{url}: not an http(s) URL")));
        }

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "Downloaded page");
        Ok(body)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(Duration::from_secs(10)).is_ok());
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_non_http_links() {
        let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
        for url in ["mailto:tips@news.test", "not a url", "ftp://files.test/a"] {
            let err = fetcher.fetch(url).await.unwrap_err();
            assert!(matches!(err, Error::InvalidUrl(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn test_static_fetcher_missing_page_is_status_error() {
        let fetcher = testing::StaticFetcher::new().with_page("https://a.test/", "<p>hi</p>");
        assert_eq!(fetcher.fetch("https://a.test/").await.unwrap(), "<p>hi</p>");
        let err = fetcher.fetch("https://b.test/").await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 404, .. }));
        assert_eq!(fetcher.requests(), vec!["https://a.test/", "https://b.test/"]);
    }
}
