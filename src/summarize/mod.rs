//! Condensation: turning article bodies into short summaries.
//!
//! A [`Condenser`] decides once, at construction, which engine it runs:
//!
//! - **Primed**: a dedicated sequence-to-sequence model ([`SummaryModel`])
//!   was loaded by a [`ModelLoader`] and serves every call
//! - **Degraded**: loading failed, so the local [`ExtractivePipeline`] serves
//!   every call for the rest of the run
//!
//! Whatever the engine, a single call never fails: a generation error (or an
//! empty summary) is replaced by the first [`FALLBACK_CHARS`] characters of
//! the input followed by `...`.
//!
//! # Submodules
//!
//! - [`hub`]: Hugging Face Hub model loader and inference client
//! - [`extractive`]: frequency-based extractive summarizer

pub mod extractive;
pub mod hub;

use crate::config::Settings;
use crate::error::Result;
use crate::utils::truncate_for_log;
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

pub use extractive::ExtractivePipeline;

/// Inputs longer than this many words are cut before summarization.
pub const MAX_INPUT_WORDS: usize = 1024;
/// Characters of input kept by the last-resort fallback.
pub const FALLBACK_CHARS: usize = 500;

/// Decoding parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub min_length: usize,
    pub max_length: usize,
    /// Values above 1.0 push beam search towards longer summaries.
    pub length_penalty: f32,
    pub num_beams: u32,
    pub early_stopping: bool,
}

impl GenerationParams {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
            length_penalty: 2.0,
            num_beams: 4,
            early_stopping: true,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.summary_min_length, settings.summary_max_length)
    }
}

/// A loaded summarization model.
pub trait SummaryModel {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Summarize `text`. Errors are absorbed by [`Condenser::condense`].
    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String>;
}

/// Loads a [`SummaryModel`] by identifier.
pub trait ModelLoader {
    type Model: SummaryModel;

    async fn load(&self, model_id: &str) -> Result<Self::Model>;
}

/// Which path a [`Condenser`] runs on.
pub enum Engine<M> {
    Primed(M),
    Degraded(ExtractivePipeline),
}

impl<M> fmt::Debug for Engine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Primed(_) => f.write_str("Primed"),
            Engine::Degraded(_) => f.write_str("Degraded"),
        }
    }
}

#[derive(Debug)]
pub struct Condenser<M> {
    engine: Engine<M>,
    params: GenerationParams,
}

impl<M: SummaryModel> Condenser<M> {
    /// Try to load the configured model; fall back to the extractive pipeline.
    ///
    /// The outcome is fixed for the lifetime of the condenser: a failed load
    /// is not retried.
    #[instrument(level = "info", skip_all, fields(model = %settings.summarization_model))]
    pub async fn load<L>(loader: &L, settings: &Settings) -> Self
    where
        L: ModelLoader<Model = M>,
    {
        let params = GenerationParams::from_settings(settings);
        match loader.load(&settings.summarization_model).await {
            Ok(model) => {
                info!(model = model.name(), "Summarization model loaded");
                Self::primed(model, params)
            }
            Err(e) => {
                error!(error = %e, "Error loading summarization model");
                warn!("Falling back to the extractive summarization pipeline");
                Self::degraded(params)
            }
        }
    }

    /// A condenser backed by a loaded model.
    ///
    /// # Arguments
    ///
    /// * `model` - The summarization model every `condense` call goes through
    /// * `params` - Length and beam-search parameters passed on each call
    ///
    /// # Returns
    ///
    /// A condenser whose [`Condenser::is_primed`] is `true`.
    pub fn primed(model: M, params: GenerationParams) -> Self {
        Self {
            engine: Engine::Primed(model),
            params,
        }
    }

    /// A condenser that uses the local extractive summarizer.
    pub fn degraded(params: GenerationParams) -> Self {
        Self {
            engine: Engine::Degraded(ExtractivePipeline),
            params,
        }
    }

    pub fn is_primed(&self) -> bool {
        matches!(self.engine, Engine::Primed(_))
    }

    /// Summarize a single text. Never fails.
    pub async fn condense(&self, text: &str) -> String {
        if text.trim().is_empty() {
            warn!("Empty text provided for summarization");
            return String::new();
        }

        let input = truncate_words(text, MAX_INPUT_WORDS);
        let generated = match &self.engine {
            Engine::Primed(model) => model.generate(&input, &self.params).await,
            Engine::Degraded(pipeline) => pipeline.summarize(&input, &self.params),
        };

        match generated {
            Ok(summary) if !summary.trim().is_empty() => {
                debug!(preview = %truncate_for_log(&summary, 80), "Generated summary");
                summary.trim().to_string()
            }
            Ok(_) => {
                error!(engine = ?self.engine, "Summarizer returned an empty summary; using truncated text");
                fallback_summary(&input)
            }
            Err(e) => {
                error!(engine = ?self.engine, error = %e, "Error during summarization; using truncated text");
                fallback_summary(&input)
            }
        }
    }

    /// Summarize every text in order, one at a time.
    #[instrument(level = "info", skip_all, fields(count = texts.len(), engine = ?self.engine))]
    pub async fn batch_condense(&self, texts: &[String]) -> Vec<String> {
        let mut summaries = Vec::with_capacity(texts.len());
        for text in texts {
            summaries.push(self.condense(text).await);
        }
        summaries
    }
}

/// Keep at most `max_words` whitespace-separated words.
///
/// Text under the limit is returned untouched; longer text is re-joined with
/// single spaces.
pub fn truncate_words(text: &str, max_words: usize) -> Cow<'_, str> {
    let count = text.split_whitespace().count();
    if count <= max_words {
        return Cow::Borrowed(text);
    }
    warn!(words = count, max_words, "Text too long; truncating");
    Cow::Owned(
        text.split_whitespace()
            .take(max_words)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// The deterministic last resort: the head of the input plus an ellipsis.
pub fn fallback_summary(text: &str) -> String {
    let head: String = text.chars().take(FALLBACK_CHARS).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingModel {
        inputs: Mutex<Vec<String>>,
    }

    impl SummaryModel for RecordingModel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String> {
            self.inputs.lock().unwrap().push(text.to_string());
            Ok(format!("summary of {} words ({}-{})", text.split_whitespace().count(), params.min_length, params.max_length))
        }
    }

    #[derive(Debug)]
    struct FailingModel;

    impl SummaryModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _text: &str, _params: &GenerationParams) -> Result<String> {
            Err(Error::Generation("CUDA out of memory".to_string()))
        }
    }

    #[derive(Debug)]
    struct BlankModel;

    impl SummaryModel for BlankModel {
        fn name(&self) -> &str {
            "blank"
        }

        async fn generate(&self, _text: &str, _params: &GenerationParams) -> Result<String> {
            Ok("   ".to_string())
        }
    }

    struct Loader {
        succeed: bool,
    }

    impl ModelLoader for Loader {
        type Model = RecordingModel;

        async fn load(&self, model_id: &str) -> Result<RecordingModel> {
            if self.succeed {
                Ok(RecordingModel::default())
            } else {
                Err(Error::ModelLoad(format!("{model_id} not found")))
            }
        }
    }

    fn params() -> GenerationParams {
        GenerationParams::new(5, 40)
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_without_model_call() {
        let condenser = Condenser::primed(RecordingModel::default(), params());
        assert_eq!(condenser.condense("").await, "");
        assert_eq!(condenser.condense("   \n").await, "");
        let Engine::Primed(model) = &condenser.engine else {
            panic!("expected primed engine");
        };
        assert!(model.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primed_model_receives_params() {
        let condenser = Condenser::primed(RecordingModel::default(), params());
        assert_eq!(
            condenser.condense("one two three").await,
            "summary of 3 words (5-40)"
        );
    }

    #[tokio::test]
    async fn test_long_input_truncated_to_word_cap() {
        let condenser = Condenser::primed(RecordingModel::default(), params());
        let text = vec!["word"; MAX_INPUT_WORDS + 200].join("\n");

        let summary = condenser.condense(&text).await;

        assert_eq!(summary, format!("summary of {MAX_INPUT_WORDS} words (5-40)"));
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back_to_truncated_input() {
        let condenser = Condenser::primed(FailingModel, params());
        let text = "x".repeat(800);

        let summary = condenser.condense(&text).await;

        assert_eq!(summary, format!("{}...", "x".repeat(FALLBACK_CHARS)));
    }

    #[tokio::test]
    async fn test_fallback_uses_word_truncated_input() {
        let condenser = Condenser::primed(FailingModel, params());
        let text = format!("{} tail", vec!["ab"; MAX_INPUT_WORDS].join("   "));

        let summary = condenser.condense(&text).await;

        // Truncation re-joins words with single spaces, so the head is "ab ab ab ...".
        let expected_head: String = vec!["ab"; MAX_INPUT_WORDS].join(" ").chars().take(FALLBACK_CHARS).collect();
        assert_eq!(summary, format!("{expected_head}..."));
    }

    #[tokio::test]
    async fn test_short_input_fallback_still_gets_ellipsis() {
        let condenser = Condenser::primed(FailingModel, params());
        assert_eq!(condenser.condense("Short text.").await, "Short text....");
    }

    #[tokio::test]
    async fn test_blank_summary_counts_as_failure() {
        let condenser = Condenser::primed(BlankModel, params());
        assert_eq!(condenser.condense("Some article.").await, "Some article....");
    }

    #[tokio::test]
    async fn test_load_success_is_primed() {
        let settings = Settings::default();
        let condenser = Condenser::load(&Loader { succeed: true }, &settings).await;
        assert!(condenser.is_primed());
        assert_eq!(condenser.params, GenerationParams::new(50, 150));
    }

    #[tokio::test]
    async fn test_load_failure_is_degraded_and_still_summarizes() {
        let settings = Settings {
            summary_min_length: 3,
            summary_max_length: 12,
            ..Settings::default()
        };
        let condenser = Condenser::load(&Loader { succeed: false }, &settings).await;
        assert!(!condenser.is_primed());

        let summary = condenser
            .condense("Robots learned to juggle. Robots juggled knives badly. The audience left early.")
            .await;
        assert!(!summary.is_empty());
        assert!(!summary.ends_with("..."));
    }

    #[tokio::test]
    async fn test_batch_condense_preserves_order() {
        let condenser = Condenser::primed(RecordingModel::default(), params());
        let texts = vec!["a b".to_string(), String::new(), "a b c d".to_string()];

        let summaries = condenser.batch_condense(&texts).await;

        assert_eq!(
            summaries,
            vec![
                "summary of 2 words (5-40)".to_string(),
                String::new(),
                "summary of 4 words (5-40)".to_string(),
            ]
        );
    }

    #[test]
    fn test_truncate_words_borrows_short_text() {
        assert!(matches!(truncate_words("a  b\nc", 3), Cow::Borrowed("a  b\nc")));
        assert_eq!(truncate_words("a b c d", 2), "a b");
    }
}
