//! Tone transformation: rewriting summaries as light-hearted news segments.
//!
//! Every call degrades to a pass-through (`title`, blank line, `summary`)
//! when no API key is configured or the request fails for any reason.

use crate::api::{AskAsync, ChatClient, RetryAsk};
use crate::config::Settings;
use crate::models::ArticleRecord;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

pub const SYSTEM_PROMPT: &str =
    "You are a witty tech journalist specializing in AI news with a great sense of humor.";

/// The user turn sent for one article.
pub fn build_prompt(title: &str, summary: &str) -> String {
    format!(
        "Rewrite this AI news summary in a humorous, entertaining way:\n\
         \n\
         Title: {title}\n\
         Summary: {summary}\n\
         \n\
         Make it witty, include some puns related to AI, and maintain all the key facts.\n\
         Format it as a short, funny news segment that would make people laugh \
         while still being informative."
    )
}

/// The deterministic fallback output.
pub fn pass_through(title: &str, summary: &str) -> String {
    format!("{title}\n\n{summary}")
}

#[derive(Debug)]
pub struct ToneTransformer<C> {
    client: Option<C>,
}

impl ToneTransformer<RetryAsk<ChatClient>> {
    /// Build the chat client from settings, or a pass-through transformer
    /// when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Self {
        let Some(api_key) = settings.openai_api_key.as_deref() else {
            warn!("OpenAI API key not found; stylization will pass summaries through");
            return Self::disabled();
        };

        match ChatClient::new(api_key, settings, SYSTEM_PROMPT) {
            Ok(client) => Self::new(RetryAsk::new(
                client,
                settings.humor_max_retries,
                Duration::from_secs(1),
            )),
            Err(e) => {
                error!(error = %e, "Could not build chat client; stylization will pass summaries through");
                Self::disabled()
            }
        }
    }
}

impl<C> ToneTransformer<C>
where
    C: AskAsync<Response = String>,
{
    pub fn new(client: C) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Rewrite one (title, summary) pair. Never fails.
    pub async fn transform(&self, title: &str, summary: &str) -> String {
        let Some(client) = &self.client else {
            return pass_through(title, summary);
        };

        match client.ask(&build_prompt(title, summary)).await {
            Ok(styled) => styled,
            Err(e) => {
                error!(%title, error = %e, "Error generating humorous summary");
                pass_through(title, summary)
            }
        }
    }

    /// Fill `stylized_content` for every record that has a summary and no
    /// stylized content yet. Records are handled one at a time and
    /// independently.
    #[instrument(level = "info", skip_all, fields(count = records.len(), enabled = self.is_enabled()))]
    pub async fn batch_transform(&self, records: &mut [ArticleRecord]) {
        let mut styled = 0usize;
        for record in records.iter_mut() {
            if record.stylized_content.is_some() {
                continue;
            }
            let Some(summary) = record.summary.as_deref() else {
                warn!(url = %record.url, "Skipping stylization of unsummarized article");
                continue;
            };
            let content = self.transform(&record.title, summary).await;
            record.stylized_content = Some(content);
            styled += 1;
        }
        info!(styled, "Stylization complete");
    }
}
