//! The batch run: ingestion, condensation, stylization.
//!
//! A run moves through `Start → Ingested → Summarized → Stylized → Done` and
//! stops early with [`RunOutcome::Aborted`] when ingestion yields nothing.
//! Per-item failures never reach this level; an [`Error`] returned from
//! [`Pipeline::run`] means the record set itself is inconsistent.

use crate::api::AskAsync;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::humor::ToneTransformer;
use crate::models::{ArticleRecord, SourceDescriptor};
use crate::scrapers::PageFetcher;
use crate::scrapers::ingest::Ingestor;
use crate::summarize::{Condenser, ModelLoader, SummaryModel};
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const NO_ARTICLES: &str = "no articles collected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Ingested,
    Summarized,
    Stylized,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Ingested => "ingested",
            Stage::Summarized => "summarized",
            Stage::Stylized => "stylized",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every record carries a summary and stylized content.
    Completed(Vec<ArticleRecord>),
    Aborted { reason: String },
}

pub struct Pipeline<F, L, C> {
    sources: Vec<SourceDescriptor>,
    ingestor: Ingestor<F>,
    loader: L,
    tone: ToneTransformer<C>,
    settings: Settings,
}

impl<F, L, C> Pipeline<F, L, C>
where
    F: PageFetcher,
    L: ModelLoader,
    C: AskAsync<Response = String>,
{
    pub fn new(
        sources: Vec<SourceDescriptor>,
        fetcher: F,
        loader: L,
        tone: ToneTransformer<C>,
        settings: Settings,
    ) -> Self {
        Self {
            sources,
            ingestor: Ingestor::new(fetcher, &settings),
            loader,
            tone,
            settings,
        }
    }

    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run(&self) -> Result<RunOutcome> {
        let mut stage = Stage::Start;
        let mut stage_t0 = Instant::now();
        info!(%stage, "Starting news pipeline");

        let mut records = self.ingestor.ingest(&self.sources).await;
        stage = enter(Stage::Ingested, &mut stage_t0, records.len());
        if records.is_empty() {
            warn!(%stage, reason = NO_ARTICLES, "Aborting run");
            return Ok(RunOutcome::Aborted {
                reason: NO_ARTICLES.to_string(),
            });
        }

        // The model is only worth loading once there is something to summarize.
        let condenser = Condenser::load(&self.loader, &self.settings).await;
        summarize_pending(&condenser, &mut records).await;
        stage = enter(Stage::Summarized, &mut stage_t0, records.len());
        if let Some(r) = records.iter().find(|r| r.summary.is_none()) {
            return Err(Error::Inconsistent(format!(
                "{} left {stage} stage without a summary",
                r.url
            )));
        }

        self.tone.batch_transform(&mut records).await;
        stage = enter(Stage::Stylized, &mut stage_t0, records.len());
        if let Some(r) = records.iter().find(|r| !r.is_complete()) {
            return Err(Error::Inconsistent(format!(
                "{} left {stage} stage incomplete",
                r.url
            )));
        }

        enter(Stage::Done, &mut stage_t0, records.len());
        Ok(RunOutcome::Completed(records))
    }
}

fn enter(stage: Stage, stage_t0: &mut Instant, records: usize) -> Stage {
    info!(
        %stage,
        records,
        elapsed_ms = stage_t0.elapsed().as_millis(),
        "Pipeline stage reached"
    );
    *stage_t0 = Instant::now();
    stage
}

/// Condense every record that has no summary yet, in order.
async fn summarize_pending<M: SummaryModel>(
    condenser: &Condenser<M>,
    records: &mut [ArticleRecord],
) {
    let pending: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.summary.is_none())
        .map(|(i, _)| i)
        .collect();
    if pending.is_empty() {
        return;
    }

    let texts: Vec<String> = pending.iter().map(|&i| records[i].text.clone()).collect();
    let summaries = condenser.batch_condense(&texts).await;
    for (i, summary) in pending.into_iter().zip(summaries) {
        records[i].summary = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatClient, RetryAsk};
    use crate::scrapers::testing::{StaticFetcher, article_page};
    use crate::summarize::GenerationParams;
    use chrono::{SecondsFormat, Utc};
    use itertools::Itertools;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingModel {
        calls: AtomicUsize,
    }

    impl SummaryModel for CountingModel {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, text: &str, _params: &GenerationParams) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(text.split_whitespace().take(5).join(" "))
        }
    }

    struct UnavailableLoader;

    impl ModelLoader for UnavailableLoader {
        type Model = CountingModel;

        async fn load(&self, model_id: &str) -> Result<CountingModel> {
            Err(Error::ModelLoad(format!("{model_id}: offline")))
        }
    }

    struct ReadyLoader;

    impl ModelLoader for ReadyLoader {
        type Model = CountingModel;

        async fn load(&self, _model_id: &str) -> Result<CountingModel> {
            Ok(CountingModel::default())
        }
    }

    #[derive(Debug)]
    struct Punster;

    impl AskAsync for Punster {
        type Response = String;

        async fn ask(&self, _text: &str) -> Result<String> {
            Ok("Neural news, now with extra layers.".to_string())
        }
    }

    fn now() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn two_sources() -> (Vec<SourceDescriptor>, StaticFetcher) {
        let fetcher = StaticFetcher::new()
            .with_page(
                "https://good.test/",
                r#"<a href="/one">One</a><a href="/two">Two</a>"#,
            )
            .with_page("https://good.test/one", &article_page("One", &now()))
            .with_page("https://good.test/two", &article_page("Two", &now()));
        let sources = vec![
            SourceDescriptor::new("Good", "https://good.test/"),
            SourceDescriptor::new("Down", "https://down.test/"),
        ];
        (sources, fetcher)
    }

    #[tokio::test]
    async fn test_end_to_end_with_one_failing_source() {
        let (sources, fetcher) = two_sources();
        let pipeline = Pipeline::new(
            sources,
            fetcher,
            ReadyLoader,
            ToneTransformer::new(Punster),
            Settings::default(),
        );

        let RunOutcome::Completed(records) = pipeline.run().await.unwrap() else {
            panic!("expected a completed run");
        };

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(ArticleRecord::is_complete));
        assert!(records.iter().map(|r| &r.url).all_unique());
        assert_eq!(records[0].summary.as_deref(), Some("Researchers announced a new language"));
        assert_eq!(
            records[1].stylized_content.as_deref(),
            Some("Neural news, now with extra layers.")
        );
    }

    #[tokio::test]
    async fn test_degraded_model_and_missing_key_still_complete() {
        let (sources, fetcher) = two_sources();
        let pipeline = Pipeline::new(
            sources,
            fetcher,
            UnavailableLoader,
            ToneTransformer::<RetryAsk<ChatClient>>::disabled(),
            Settings::default(),
        );

        let RunOutcome::Completed(records) = pipeline.run().await.unwrap() else {
            panic!("expected a completed run");
        };

        assert_eq!(records.len(), 2);
        for record in &records {
            let summary = record.summary.as_deref().unwrap();
            assert!(!summary.is_empty());
            assert_eq!(
                record.stylized_content.as_deref(),
                Some(format!("{}\n\n{}", record.title, summary).as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_no_articles_aborts() {
        let pipeline = Pipeline::new(
            vec![SourceDescriptor::new("Down", "https://down.test/")],
            StaticFetcher::new(),
            ReadyLoader,
            ToneTransformer::new(Punster),
            Settings::default(),
        );

        assert_eq!(
            pipeline.run().await.unwrap(),
            RunOutcome::Aborted {
                reason: "no articles collected".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_summarize_pending_skips_summarized_records() {
        let condenser = Condenser::primed(CountingModel::default(), GenerationParams::new(1, 10));
        let mut done = ArticleRecord::new("A", "alpha text", "https://a.test/a", "A", Utc::now());
        done.summary = Some("kept".to_string());
        let fresh = ArticleRecord::new("B", "beta text here", "https://a.test/b", "A", Utc::now());
        let mut records = vec![done, fresh];

        summarize_pending(&condenser, &mut records).await;

        assert_eq!(records[0].summary.as_deref(), Some("kept"));
        assert_eq!(records[1].summary.as_deref(), Some("beta text here"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Start.to_string(), "start");
        assert_eq!(Stage::Done.to_string(), "done");
    }
}
