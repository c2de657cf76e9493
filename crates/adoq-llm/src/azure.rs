//! Azure OpenAI Provider Implementation
//!
//! Chat completions against an Azure OpenAI deployment.
//!
//! # Features
//!
//! - Retry with exponential backoff on transport errors, 429 and 5xx
//! - One automatic retry with a larger token budget when the model stops
//!   because it ran out of tokens
//! - API-key or bearer-token authentication; the credential is opaque
//!
//! # Examples
//!
//! ```no_run
//! use adoq_llm::{AzureOpenAiConfig, AzureOpenAiProvider};
//!
//! let config = AzureOpenAiConfig {
//!     endpoint: "https://example.openai.azure.com".to_string(),
//!     deployment: "gpt-4o-mini".to_string(),
//!     ..AzureOpenAiConfig::default()
//! };
//! let provider = AzureOpenAiProvider::from_env(config).unwrap();
//! ```

use crate::LlmError;
use adoq_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API version
pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

/// Default environment variable holding the credential
pub const DEFAULT_CREDENTIAL_ENV: &str = "AZURE_OPENAI_API_KEY";

/// Largest budget the truncation retry will ask for
pub const DEFAULT_TRUNCATION_CAP: u32 = 8000;

/// How the credential is presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `api-key` header
    #[default]
    ApiKey,
    /// `Authorization: Bearer` header (Entra ID token)
    Bearer,
}

/// Configuration for the Azure OpenAI provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://name.openai.azure.com`
    pub endpoint: String,

    /// Deployment name
    pub deployment: String,

    /// REST API version
    pub api_version: String,

    /// Credential presentation
    pub auth: AuthScheme,

    /// Environment variable the credential is read from
    pub credential_env: String,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Attempts per request, including the first
    pub max_retries: u32,

    /// Token budget ceiling for the truncation retry
    pub truncation_cap: u32,

    /// Optional system message prepended to every request
    pub system_prompt: Option<String>,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: AuthScheme::ApiKey,
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            timeout_secs: 60,
            max_retries: 3,
            truncation_cap: DEFAULT_TRUNCATION_CAP,
            system_prompt: None,
        }
    }
}

impl AzureOpenAiConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err("endpoint must be an http(s) URL".to_string());
        }
        if self.deployment.trim().is_empty() {
            return Err("deployment must not be empty".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Chat completions URL for this deployment
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    completion_tokens: u32,
}

/// One completion, reduced to what the retry logic needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text
    pub content: String,

    /// The model stopped at the token limit
    pub truncated: bool,

    /// Completion tokens consumed
    pub tokens_used: u32,
}

/// Parse a chat-completions response body
pub fn parse_completion(body: &str) -> Result<Completion, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        truncated: choice.finish_reason.as_deref() == Some("length"),
        tokens_used: response.usage.map(|u| u.completion_tokens).unwrap_or(0),
    })
}

/// Budget for the truncation retry, if one is worth making
///
/// Half again what the truncated attempt used, capped; `None` when that
/// would not raise the budget.
pub fn truncation_retry_budget(tokens_used: u32, current: u32, cap: u32) -> Option<u32> {
    if current >= cap {
        return None;
    }
    let proposed = tokens_used.saturating_add(tokens_used / 2).min(cap);
    (proposed > current).then_some(proposed)
}

/// Azure OpenAI chat-completions provider
///
/// Clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct AzureOpenAiProvider {
    config: AzureOpenAiConfig,
    credential: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("config", &self.config)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl AzureOpenAiProvider {
    /// Create a provider with an explicit credential
    pub fn new(config: AzureOpenAiConfig, credential: impl Into<String>) -> Result<Self, LlmError> {
        config.validate().map_err(LlmError::Config)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            credential: credential.into(),
            client,
        })
    }

    /// Create a provider reading the credential from the configured variable
    pub fn from_env(config: AzureOpenAiConfig) -> Result<Self, LlmError> {
        let credential = std::env::var(&config.credential_env).map_err(|_| {
            LlmError::Config(format!("environment variable {} is not set", config.credential_env))
        })?;
        Self::new(config, credential)
    }

    /// Active configuration
    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }

    fn send_once(&self, request: &ChatRequest<'_>) -> Result<Completion, LlmError> {
        let builder = self.client.post(self.config.completions_url()).json(request);
        let builder = match self.config.auth {
            AuthScheme::ApiKey => builder.header("api-key", &self.credential),
            AuthScheme::Bearer => builder.bearer_auth(&self.credential),
        };

        let response = builder
            .send()
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.config.deployment.clone()));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }

        let body = response
            .text()
            .map_err(|e| LlmError::Communication(format!("Failed to read body: {}", e)))?;
        if !status.is_success() {
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, body)));
        }
        parse_completion(&body)
    }

    fn is_retryable(error: &LlmError) -> bool {
        match error {
            LlmError::RateLimitExceeded => true,
            LlmError::Communication(msg) => !msg.starts_with("HTTP 4"),
            _ => false,
        }
    }

    /// Send with retry and exponential backoff: 1s, 2s, 4s, ...
    fn send(&self, request: &ChatRequest<'_>) -> Result<Completion, LlmError> {
        let mut attempts = 0;
        loop {
            match self.send_once(request) {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries || !Self::is_retryable(&e) {
                        return Err(e);
                    }
                    let delay = Duration::from_secs(2u64.pow(attempts - 1));
                    warn!(attempt = attempts, error = %e, "Completion failed, retrying");
                    std::thread::sleep(delay);
                }
            }
        }
    }

    fn complete(&self, prompt: &str, schema: Option<&str>, max_tokens: u32) -> Result<String, LlmError> {
        let system = match (schema, &self.config.system_prompt) {
            (Some(schema), Some(base)) => Some(format!(
                "{}\n\nRespond with a single JSON object matching this schema:\n{}",
                base, schema
            )),
            (Some(schema), None) => Some(format!(
                "Respond with a single JSON object matching this schema:\n{}",
                schema
            )),
            (None, base) => base.clone(),
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        let mut request = ChatRequest {
            messages,
            max_completion_tokens: max_tokens,
            response_format: schema.map(|_| ResponseFormat { kind: "json_object" }),
        };

        let first = self.send(&request)?;
        debug!(
            tokens_used = first.tokens_used,
            max_tokens,
            truncated = first.truncated,
            "Completion received"
        );
        if !first.truncated {
            return Ok(first.content);
        }

        let Some(budget) =
            truncation_retry_budget(first.tokens_used, max_tokens, self.config.truncation_cap)
        else {
            warn!(max_tokens, "Completion truncated at the token limit");
            return Ok(first.content);
        };

        debug!(from = max_tokens, to = budget, "Retrying truncated completion");
        request.max_completion_tokens = budget;
        match self.send(&request) {
            Ok(retry) if !retry.truncated => Ok(retry.content),
            _ => {
                warn!(budget, "Completion still truncated after retry");
                Ok(first.content)
            }
        }
    }
}

impl LlmProviderTrait for AzureOpenAiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, Self::Error> {
        self.complete(prompt, None, max_tokens)
    }

    fn generate_structured(
        &self,
        prompt: &str,
        schema: &str,
        max_tokens: u32,
    ) -> Result<String, Self::Error> {
        self.complete(prompt, Some(schema), max_tokens)
    }
}
