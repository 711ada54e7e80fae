//! Summarization models served from the Hugging Face Hub.
//!
//! Loading checks the model card through the Hub API: the model must be a
//! summarization (or text-to-text) model and ship a tokenizer. Generation then
//! goes through the hosted inference endpoint for that model.

use super::{GenerationParams, ModelLoader, SummaryModel};
use crate::config::Settings;
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";
pub const DEFAULT_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// Cold models can take a while to spin up on the inference side.
const INFERENCE_TIMEOUT: Duration = Duration::from_secs(120);

const SUMMARIZATION_TASKS: &[&str] = &["summarization", "text2text-generation"];

const TOKENIZER_FILES: &[&str] = &[
    "tokenizer.json",
    "tokenizer_config.json",
    "spiece.model",
    "sentencepiece.bpe.model",
    "vocab.json",
];

#[derive(Debug, Deserialize)]
struct ModelInfo {
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    siblings: Vec<Sibling>,
}

#[derive(Debug, Deserialize)]
struct Sibling {
    rfilename: String,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    min_length: usize,
    max_length: usize,
    length_penalty: f32,
    num_beams: u32,
    early_stopping: bool,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Summaries(Vec<SummaryOutput>),
    Failure { error: String },
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    #[serde(alias = "generated_text")]
    summary_text: String,
}

/// Resolves model identifiers against the Hub.
pub struct HubModelLoader {
    client: Client,
    hub_url: String,
    inference_url: String,
    token: Option<String>,
}

impl fmt::Debug for HubModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubModelLoader")
            .field("hub_url", &self.hub_url)
            .field("inference_url", &self.inference_url)
            .field("token", &self.token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HubModelLoader {
    /// Loader for `settings.summarization_model`, authenticated with
    /// `settings.hf_api_token` when one is set.
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder().timeout(INFERENCE_TIMEOUT).build()?;
        Ok(Self {
            client,
            hub_url: DEFAULT_HUB_URL.to_string(),
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            token: settings.hf_api_token.clone(),
        })
    }
}

fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

impl ModelLoader for HubModelLoader {
    type Model = HubSummaryModel;

    #[instrument(level = "info", skip(self))]
    async fn load(&self, model_id: &str) -> Result<HubSummaryModel> {
        let url = format!("{}/api/models/{}", self.hub_url, model_id);
        let response = authorized(self.client.get(&url), self.token.as_deref())
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::ModelLoad(format!(
                "{model_id}: model lookup answered with HTTP {}",
                status.as_u16()
            )));
        }

        let info: ModelInfo = response.json().await?;
        check_model_info(model_id, &info)?;
        info!(
            pipeline_tag = info.pipeline_tag.as_deref().unwrap_or("-"),
            files = info.siblings.len(),
            "Model card checked"
        );

        Ok(HubSummaryModel {
            client: self.client.clone(),
            model_id: model_id.to_string(),
            endpoint: format!("{}/{}", self.inference_url, model_id),
            token: self.token.clone(),
        })
    }
}

/// Reject models that cannot serve as a seq2seq summarizer.
fn check_model_info(model_id: &str, info: &ModelInfo) -> Result<()> {
    match info.pipeline_tag.as_deref() {
        Some(tag) if SUMMARIZATION_TASKS.contains(&tag) => {}
        Some(tag) => {
            return Err(Error::ModelLoad(format!(
                "{model_id}: unsupported task '{tag}'"
            )));
        }
        None => {
            return Err(Error::ModelLoad(format!("{model_id}: no task declared")));
        }
    }

    let has_tokenizer = info
        .siblings
        .iter()
        .any(|s| TOKENIZER_FILES.contains(&s.rfilename.as_str()));
    if !has_tokenizer {
        return Err(Error::ModelLoad(format!("{model_id}: no tokenizer files")));
    }
    Ok(())
}

/// A checked Hub model, summarizing through its inference endpoint.
pub struct HubSummaryModel {
    client: Client,
    model_id: String,
    endpoint: String,
    token: Option<String>,
}

impl fmt::Debug for HubSummaryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSummaryModel")
            .field("model_id", &self.model_id)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SummaryModel for HubSummaryModel {
    fn name(&self) -> &str {
        &self.model_id
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model_id, chars = text.len()))]
    async fn generate(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                min_length: params.min_length,
                max_length: params.max_length,
                length_penalty: params.length_penalty,
                num_beams: params.num_beams,
                early_stopping: params.early_stopping,
            },
            options: InferenceOptions {
                wait_for_model: true,
            },
        };

        let response = authorized(self.client.post(&self.endpoint), self.token.as_deref())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), bytes = body.len(), "Inference response");

        inference_result(status, &body)
    }
}

/// Reject non-2xx answers before looking at the body. The server's error
/// text is kept when the body carries one.
fn inference_result(status: StatusCode, body: &str) -> Result<String> {
    if !status.is_success() {
        let detail = match serde_json::from_str::<InferenceResponse>(body) {
            Ok(InferenceResponse::Failure { error }) => format!(": {error}"),
            _ => String::new(),
        };
        return Err(Error::Generation(format!(
            "inference answered with HTTP {}{detail}",
            status.as_u16()
        )));
    }
    parse_inference_response(body)
}

fn parse_inference_response(body: &str) -> Result<String> {
    match serde_json::from_str::<InferenceResponse>(body) {
        Ok(InferenceResponse::Summaries(outputs)) => outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text.trim().to_string())
            .ok_or_else(|| Error::Generation("inference returned no outputs".to_string())),
        Ok(InferenceResponse::Failure { error }) => Err(Error::Generation(error)),
        Err(e) => Err(Error::Generation(format!("unreadable inference response: {e}"))),
    }
}
