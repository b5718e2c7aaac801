//! LLM Client implementations
//!
//! Provides the HTTP clients behind the external extraction service:
//! OpenAI-compatible chat completions, a local Ollama server and Google
//! Gemini. Every client is built on a `reqwest::Client` carrying the
//! configured request timeout.

use std::time::Duration;

use async_trait::async_trait;
use lexner_core::{LexError, LlmClient, LlmConfig, LlmProvider, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LexError::LlmError(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-success status into an error carrying the response body
async fn check_status(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(LexError::LlmError(format!("{provider} error ({status}): {error_text}")))
}

// ============================================================================
// OpenAI Client
// ============================================================================

/// OpenAI (or compatible) chat completions client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| LexError::ConfigError("OpenAI API key required".to_string()))?;

        let base_url = config
            .openai_base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            api_key: api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn parse_response(result: OpenAiResponse) -> Result<String> {
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LexError::LlmError("No response generated".to_string()))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LexError::LlmError(format!("Request failed: {e}")))?;

        let result: OpenAiResponse = check_status(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| LexError::LlmError(format!("Failed to parse response: {e}")))?;

        Self::parse_response(result)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Ollama Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| LexError::LlmError(format!("Ollama request failed: {e}")))?;

        let result: OllamaResponse = check_status(response, "Ollama")
            .await?
            .json()
            .await
            .map_err(|e| LexError::LlmError(format!("Failed to parse Ollama response: {e}")))?;

        Ok(result.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ============================================================================
// Gemini Client
// ============================================================================

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create from config
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .as_ref()
            .ok_or_else(|| LexError::ConfigError("Gemini API key required".to_string()))?;

        Ok(Self {
            client: http_client(Duration::from_secs(config.timeout_secs))?,
            api_key: api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Concatenated text parts of the first candidate
    fn parse_response(result: GeminiResponse) -> Result<String> {
        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LexError::LlmError("No response generated".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| LexError::LlmError(format!("Gemini request failed: {e}")))?;

        let result: GeminiResponse = check_status(response, "Gemini")
            .await?
            .json()
            .await
            .map_err(|e| LexError::LlmError(format!("Failed to parse Gemini response: {e}")))?;

        Self::parse_response(result)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create an LLM client from config; `None` when the provider is offline
pub fn create_llm_client(config: &LlmConfig) -> Result<Option<Box<dyn LlmClient>>> {
    let client: Box<dyn LlmClient> = match config.provider {
        LlmProvider::None => return Ok(None),
        LlmProvider::OpenAI => Box::new(OpenAiClient::from_config(config)?),
        LlmProvider::Ollama => Box::new(OllamaClient::from_config(config)?),
        LlmProvider::Gemini => Box::new(GeminiClient::from_config(config)?),
    };

    debug!(
        client = client.name(),
        model = %config.model,
        timeout_secs = config.timeout_secs,
        "Created LLM client"
    );
    Ok(Some(client))
}

// ============================================================================
// Tests
// ============================================================================
