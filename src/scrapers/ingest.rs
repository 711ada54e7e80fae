//! The source ingestion engine.
//!
//! For each configured source, in order:
//!
//! 1. Download the landing page (failure: the source contributes nothing)
//! 2. Discover links and keep the first `max_articles_per_source`
//! 3. Extract each link (failure: that link is skipped)
//!
//! The merged records are then deduplicated by URL (first occurrence wins)
//! and everything published before `now - days_to_look_back` is dropped.
//! An empty result is a normal outcome; the orchestrator decides what it means.

use super::PageFetcher;
use super::article;
use super::index::discover_links;
use crate::config::Settings;
use crate::models::{ArticleRecord, SourceDescriptor};
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug)]
pub struct Ingestor<F> {
    fetcher: F,
    max_per_source: usize,
    lookback: TimeDelta,
}

impl<F: PageFetcher> Ingestor<F> {
    pub fn new(fetcher: F, settings: &Settings) -> Self {
        Self::with_limits(
            fetcher,
            settings.max_articles_per_source,
            settings.days_to_look_back,
        )
    }

    /// Build an ingestor with explicit limits.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Downloads landing pages and articles.
    /// * `max_per_source` - Links extracted per source at most.
    /// * `lookback_days` - Articles published earlier than this many days ago
    ///   are dropped. A window reaching past the earliest representable date
    ///   keeps everything.
    ///
    /// # Returns
    ///
    /// An `Ingestor` ready for [`Ingestor::ingest`].
    pub fn with_limits(fetcher: F, max_per_source: usize, lookback_days: u32) -> Self {
        Self {
            fetcher,
            max_per_source,
            lookback: TimeDelta::days(i64::from(lookback_days)),
        }
    }

    /// Collect, deduplicate and recency-filter articles from every source.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn ingest(&self, sources: &[SourceDescriptor]) -> Vec<ArticleRecord> {
        let mut collected = Vec::new();
        for source in sources {
            info!(source = %source.name, "Collecting news");
            let records = self.collect_from_source(source).await;
            info!(source = %source.name, count = records.len(), "Collected articles");
            collected.extend(records);
        }

        if collected.is_empty() {
            warn!("No articles collected from any source");
            return collected;
        }

        let total = collected.len();
        let unique: Vec<ArticleRecord> = collected
            .into_iter()
            .unique_by(|r| r.url.clone())
            .collect();
        let unique_count = unique.len();

        let cutoff = Utc::now()
            .checked_sub_signed(self.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let fresh: Vec<ArticleRecord> = unique
            .into_iter()
            .filter(|r| {
                let keep = r.published_at >= cutoff;
                if !keep {
                    debug!(url = %r.url, published_at = %r.published_at, "Dropping stale article");
                }
                keep
            })
            .collect();

        info!(
            total,
            unique = unique_count,
            fresh = fresh.len(),
            %cutoff,
            "Ingestion complete"
        );
        fresh
    }

    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn collect_from_source(&self, source: &SourceDescriptor) -> Vec<ArticleRecord> {
        let landing = match self.fetcher.fetch(&source.url).await {
            Ok(html) => html,
            Err(e) => {
                error!(url = %source.url, error = %e, "Request error for source");
                return Vec::new();
            }
        };

        let mut links = discover_links(&landing, &source.url);
        let discovered = links.len();
        links.truncate(self.max_per_source);
        debug!(discovered, kept = links.len(), "Indexed source links");

        stream::iter(links)
            .then(|url| async move {
                match article::extract(&self.fetcher, &url, &source.name).await {
                    Ok(record) => Some(record),
                    Err(e) => {
                        error!(%url, error = %e, "Article extraction failed");
                        None
                    }
                }
            })
            .filter_map(std::future::ready)
            .collect()
            .await
    }
}
