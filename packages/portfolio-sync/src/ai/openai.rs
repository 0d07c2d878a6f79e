//! OpenAI implementation of the Summarizer trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_sync::ai::OpenAiSummarizer;
//! use portfolio_sync::pipeline::analysis_schema;
//!
//! let summarizer = OpenAiSummarizer::new("sk-...")
//!     .with_model("gpt-4o-mini")
//!     .with_response_schema(analysis_schema());
//! let syncer = Syncer::new(source, store, summarizer, root_folder_id);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use schemars::schema::RootSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::security::{SecretString, SummarizerCredentials};
use crate::traits::summarizer::Summarizer;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const SYSTEM_PROMPT: &str = "You are a venture capital analyst. You answer with a single JSON object.";

/// Chat-completion summarizer.
///
/// Sends the assembled prompt as the user message at a low temperature.
/// When a response schema is set the request uses OpenAI's `json_schema`
/// response format; the answer is still decoded leniently by the caller.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
    response_schema: Option<serde_json::Value>,
}

impl OpenAiSummarizer {
    /// Create a new summarizer with the given API key.
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.2,
            response_schema: None,
        }
    }

    /// Create from credentials.
    pub fn from_credentials(credentials: SummarizerCredentials) -> Self {
        let summarizer = Self::new(credentials.api_key).with_model(credentials.model);
        match credentials.base_url {
            Some(url) => summarizer.with_base_url(url),
            None => summarizer,
        }
    }

    /// Create from environment variables `OPENAI_API_KEY` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = SecretString::required("OPENAI_API_KEY", std::env::var("OPENAI_API_KEY").ok())?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_key).with_model(model))
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Ask for structured output matching this schema.
    pub fn with_response_schema(mut self, schema: RootSchema) -> Self {
        self.response_schema = serde_json::to_value(schema).ok();
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens,
            response_format: self.response_schema.clone().map(|schema| ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "company_analysis".to_string(),
                    strict: false,
                    schema,
                },
            }),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = self.request(prompt, max_tokens);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", self.api_key.bearer())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(SyncError::summarizer)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::summarizer(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(SyncError::summarizer)?;
        if let Some(usage) = &chat_response.usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI completion"
            );
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SyncError::summarizer("No response from OpenAI"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// Request/Response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis_schema;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_openai_builder() {
        let summarizer = OpenAiSummarizer::new("sk-test")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com");

        assert_eq!(summarizer.model(), "gpt-4o");
        assert_eq!(summarizer.base_url, "https://custom.api.com");
        assert!(summarizer.response_schema.is_none());
    }

    #[test]
    fn test_request_carries_schema() {
        let summarizer = OpenAiSummarizer::new("sk-test").with_response_schema(analysis_schema());
        let body = serde_json::to_value(summarizer.request("hello", 1200)).unwrap();
        assert_eq!(body["max_tokens"], 1200);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert!(body["response_format"]["json_schema"]["schema"]["properties"]["keyMetrics"].is_object());
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"sector\": \"SaaS\"}"}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5}
            })))
            .mount(&server)
            .await;

        let summarizer = OpenAiSummarizer::new("sk-test").with_base_url(server.uri());
        let answer = summarizer.complete("analyze", 100).await.unwrap();
        assert_eq!(answer, "{\"sector\": \"SaaS\"}");
    }

    #[tokio::test]
    async fn test_error_status_is_summarizer_error() {
        let server = MockServer::start().await;
        Mock::given(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let summarizer = OpenAiSummarizer::new("sk-test").with_base_url(server.uri());
        let err = summarizer.complete("analyze", 100).await.unwrap_err();
        assert!(matches!(err, SyncError::Summarizer(_)));
        assert!(err.to_string().contains("slow down"));
    }
}
