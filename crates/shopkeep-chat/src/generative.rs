//! Generative language-model fallback for messages no rule handles.
//!
//! [`GenerativeFallbackClient`] owns prompt templating, the call timeout and
//! failure classification. The model itself sits behind [`GenerativeBackend`]
//! so tests and alternative providers can be swapped in.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use shopkeep_core::config::GenerativeConfig;

use crate::error::ChatError;

/// A text-in, text-out language model.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

/// Google Gemini `generateContent` backend.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiBackend {
    pub fn new(
        api_key: &str,
        model: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            url: format!(
                "{}/models/{}:generateContent",
                endpoint.trim_end_matches('/'),
                model
            ),
        })
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::GenerativeCallFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::GenerativeCallFailed(format!(
                "Gemini API error: {} - {}",
                status, body
            )));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::GenerativeCallFailed(format!("Invalid response: {}", e)))?;

        response_text(body)
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(body: GeminiResponse) -> Result<String, ChatError> {
    if let Some(error) = body.error {
        return Err(ChatError::GenerativeCallFailed(format!(
            "Gemini error: {}",
            error.message
        )));
    }

    let text: String = body
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();
    Ok(text)
}

// ============================================================================
// Fallback client
// ============================================================================

/// Wraps an optional [`GenerativeBackend`] with prompt templating and a timeout.
///
/// A client built without a credential stays unavailable for its lifetime.
#[derive(Clone)]
pub struct GenerativeFallbackClient {
    backend: Option<Arc<dyn GenerativeBackend>>,
    timeout: Duration,
}

impl GenerativeFallbackClient {
    pub fn from_config(config: &GenerativeConfig) -> Self {
        let timeout = config.timeout();
        let Some(api_key) = config.credential() else {
            info!("No generative API key configured, fallback replies only");
            return Self::unavailable();
        };

        match GeminiBackend::new(api_key, &config.model, &config.endpoint, timeout) {
            Ok(backend) => {
                info!(model = %config.model, "Generative fallback enabled");
                Self::with_backend(Arc::new(backend), timeout)
            }
            Err(e) => {
                warn!(error = %e, "Generative backend init failed, fallback replies only");
                Self::unavailable()
            }
        }
    }

    pub fn with_backend(backend: Arc<dyn GenerativeBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            backend: None,
            timeout: Duration::ZERO,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Ask the model to answer `user_message` given the store `context`.
    pub async fn complete(&self, user_message: &str, context: &str) -> Result<String, ChatError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(ChatError::GenerativeUnavailable)?;
        let prompt = build_prompt(user_message, context);

        debug!(backend = backend.name(), prompt_len = prompt.len(), "Calling generative backend");

        let text = match tokio::time::timeout(self.timeout, backend.generate(&prompt)).await {
            Err(_) => {
                return Err(ChatError::GenerativeCallFailed(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(ChatError::GenerativeCallFailed(msg))) => {
                return Err(ChatError::GenerativeCallFailed(msg))
            }
            Ok(Err(e)) => return Err(ChatError::GenerativeCallFailed(e.to_string())),
            Ok(Ok(text)) => text,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::GenerativeCallFailed(
                "empty response".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}

impl std::fmt::Debug for GenerativeFallbackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerativeFallbackClient")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Prompt sent to the model: persona, the user's words, store context, constraints.
pub fn build_prompt(user_message: &str, context: &str) -> String {
    format!(
        "You are a helpful e-commerce shopping assistant. The user asked: \"{message}\"\n\
         \n\
         Here's information about our store:\n\
         {context}\n\
         \n\
         Please provide a helpful, friendly response. If the user is asking about products:\n\
         1. Suggest relevant products from our inventory\n\
         2. Include specific product names and prices when possible\n\
         3. Ask follow-up questions to better help them\n\
         4. Keep responses conversational and under 200 words\n\
         \n\
         If the user is asking general questions, provide helpful shopping advice while \
         staying focused on our store.",
        message = user_message,
        context = context.trim(),
    )
}
