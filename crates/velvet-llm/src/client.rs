//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use velvet_core::config::LlmConfig;
use velvet_core::error::VelvetError;

/// Token budget for classification calls. Classification replies are a
/// single small JSON object; a tighter budget keeps the call cheap.
const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Errors from the language capability collaborator.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("endpoint returned HTTP {status}: {preview}")]
    Status { status: u16, preview: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("completion was empty")]
    EmptyCompletion,
}

impl From<LlmError> for VelvetError {
    fn from(err: LlmError) -> Self {
        VelvetError::LanguageModel(err.to_string())
    }
}

/// The language capability collaborator.
///
/// Both operations are fallible and network-bound; callers own their
/// prompts and all parsing of the returned text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Classify a message; the reply is expected (not guaranteed) to be a
    /// JSON object describing the intent.
    async fn classify_intent(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError>;

    /// Generate free text from a system prompt and user message.
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpLanguageModel {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;

        tracing::info!(endpoint = %config.endpoint, model = %config.model, "Language model client ready");

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_message},
            ],
            "max_tokens": max_tokens,
            "temperature": self.temperature,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                preview: text.chars().take(200).collect(),
            });
        }

        let completion = parse_completion(&text)?;
        if completion.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(completion)
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn classify_intent(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        self.complete(system_prompt, user_message, CLASSIFY_MAX_TOKENS)
            .await
    }

    async fn generate_text(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, LlmError> {
        self.complete(system_prompt, user_message, self.max_tokens)
            .await
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

/// Extract the first choice's content from a chat-completions reply.
///
/// Gateways occasionally return HTML error pages with a 200 status, so the
/// body is sniffed before JSON parsing to produce a clearer error.
fn parse_completion(body: &str) -> Result<String, LlmError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        return Err(LlmError::MalformedResponse(
            "endpoint returned HTML instead of JSON".to_string(),
        ));
    }

    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        LlmError::MalformedResponse(format!("{}: {}", e, preview))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(LlmError::EmptyCompletion)
}
