//! Chat-completion API access with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for "send a prompt, get text back"
//! - [`ChatClient`]: OpenAI-compatible `/chat/completions` client
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Configurable number of retries (`HUMOR_MAX_RETRIES`)
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::Settings;
use crate::error::{Error, Result};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors send text to a language model and return its reply. Decorators
/// such as [`RetryAsk`] implement it too, so callers stay generic.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send `text` as the user turn and wait for the reply.
    async fn ask(&self, text: &str) -> Result<Self::Response>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Retries after the first attempt; zero means a single attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let mut delay = self.base_delay.saturating_mul(1 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Every request carries the fixed system prompt followed by one user turn.
pub struct ChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ChatClient {
    /// Create a chat client for `/chat/completions`.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token sent with every request
    /// * `settings` - Supplies the base URL, model, temperature and token limit
    /// * `system_prompt` - The system turn prepended to every request
    ///
    /// # Returns
    ///
    /// The client, or [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, settings: &Settings, system_prompt: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: settings.humor_model.clone(),
            temperature: settings.humor_temperature,
            max_tokens: settings.humor_max_tokens,
            system_prompt: system_prompt.to_string(),
        })
    }

    fn request<'a>(&'a self, text: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<String> {
        let t0 = Instant::now();
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                status = status.as_u16(),
                "API call failed"
            );
            return Err(Error::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                crate::utils::truncate_for_log(&body, 200)
            )));
        }

        let body: ChatResponse = response.json().await?;
        reply_text(body)
    }
}

/// The trimmed text of the first choice; anything else is a malformed response.
fn reply_text(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(Error::Api("response contained no message content".to_string()));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Flaky {
        failures_before_success: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Err(Error::Api(format!("attempt {n} failed")))
            } else {
                Ok(format!("ok: {text}"))
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let api = RetryAsk::new(
            Flaky {
                failures_before_success: 1,
                ..Flaky::default()
            },
            2,
            StdDuration::from_millis(1),
        );
        assert_eq!(api.ask("hi").await.unwrap(), "ok: hi");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let api = RetryAsk::new(
            Flaky {
                failures_before_success: usize::MAX,
                ..Flaky::default()
            },
            2,
            StdDuration::from_millis(1),
        );
        let err = api.ask("hi").await.unwrap_err();
        assert_eq!(err.to_string(), "API error: attempt 2 failed");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let api = RetryAsk::new(
            Flaky {
                failures_before_success: usize::MAX,
                ..Flaky::default()
            },
            0,
            StdDuration::from_millis(1),
        );
        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reply_text_trims_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Funny news!\n"}},{"message":{"content":"second"}}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(body).unwrap(), "Funny news!");
    }

    #[test]
    fn test_reply_text_rejects_malformed() {
        for raw in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            let body: ChatResponse = serde_json::from_str(raw).unwrap();
            assert!(matches!(reply_text(body), Err(Error::Api(_))), "{raw}");
        }
    }

    #[test]
    fn test_request_carries_system_prompt_and_settings() {
        let settings = Settings {
            humor_model: "gpt-test".to_string(),
            humor_temperature: 0.3,
            humor_max_tokens: 42,
            openai_base_url: "http://llm.local/v1/".to_string(),
            ..Settings::default()
        };
        let client = ChatClient::new("sk-secret", &settings, "be witty").unwrap();
        let value = serde_json::to_value(client.request("hello")).unwrap();

        assert_eq!(value["model"], "gpt-test");
        assert_eq!(value["max_tokens"], 42);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "be witty");
        assert_eq!(value["messages"][1]["content"], "hello");
        assert_eq!(client.base_url, "http://llm.local/v1");
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
