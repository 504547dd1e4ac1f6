use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{
    error::SummaryError,
    models::openai::{OpenAIErrorBody, OpenAIMessage, OpenAIRequest, OpenAIResponse},
    settings::{Settings, SettingsStore},
    utils::truncate_chars,
};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f32 = 0.7;
pub const API_TIMEOUT: Duration = Duration::from_secs(60);

const ERROR_EXCERPT_CHARS: usize = 200;

/// Turns extracted page text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String, SummaryError>;
}

pub struct LlmClient {
    http: Client,
    settings: Arc<dyn SettingsStore>,
    timeout: Duration,
}

impl LlmClient {
    #[must_use]
    pub fn new(http: Client, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            http,
            settings,
            timeout: API_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads settings, sends one chat completion request and returns the text
    /// of the first choice.
    ///
    /// # Errors
    ///
    /// Any [`SummaryError`] from settings loading through response parsing.
    pub async fn request_summary(&self, content: &str) -> Result<String, SummaryError> {
        let settings = Settings::load(self.settings.as_ref()).await?;
        if !settings.is_complete() {
            return Err(SummaryError::SettingsMissing);
        }

        let request = build_request(&settings, content);
        let url = endpoint_url(&settings.api_host);
        info!(
            "Requesting summary from {url} with model {} ({} chars)",
            settings.model_name,
            content.chars().count()
        );

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", settings.api_key))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            let detail = error_detail(&body);
            warn!("Upstream returned {status}: {detail}");
            return Err(SummaryError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        parse_summary(&body)
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, content: &str) -> Result<String, SummaryError> {
        self.request_summary(content).await
    }
}

#[must_use]
pub fn build_request(settings: &Settings, content: &str) -> OpenAIRequest {
    OpenAIRequest {
        model: settings.model_name.clone(),
        messages: vec![OpenAIMessage::user(settings.render_prompt(content))],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

#[must_use]
pub fn endpoint_url(api_host: &str) -> String {
    format!("{}{CHAT_COMPLETIONS_PATH}", api_host.trim().trim_end_matches('/'))
}

/// Human-readable message out of an upstream error body, falling back to a
/// truncated excerpt of the raw text.
#[must_use]
pub fn error_detail(body: &str) -> String {
    match serde_json::from_str::<OpenAIErrorBody>(body) {
        Ok(parsed) => parsed.into_message(),
        Err(_) if body.trim().is_empty() => "(empty response body)".to_string(),
        Err(_) => truncate_chars(body.trim(), ERROR_EXCERPT_CHARS),
    }
}

/// # Errors
///
/// [`SummaryError::ApiResponseFormat`] when the body is not JSON or carries no
/// completion text.
pub fn parse_summary(body: &str) -> Result<String, SummaryError> {
    let response: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
        debug!("Unparseable completion body: {e}");
        SummaryError::ApiResponseFormat
    })?;
    response
        .first_content()
        .map(str::to_string)
        .ok_or(SummaryError::ApiResponseFormat)
}

fn classify_transport_error(err: reqwest::Error) -> SummaryError {
    if err.is_timeout() {
        SummaryError::ApiTimeout
    } else {
        warn!("Request Error: {err}");
        SummaryError::Unknown(err.to_string())
    }
}
