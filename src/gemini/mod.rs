//! Client for the Gemini multimodal API.
//!
//! The rest of the crate talks to the model through [`VisionModel`], so tests
//! can swap in a scripted implementation. [`GeminiClient`] is the real one:
//!
//! - `GET  {base}/models` lists models, keeping those that support `generateContent`
//! - `POST {base}/{model}:generateContent` sends the system instruction, the prompt
//!   and the photo as inline base64 data

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Used whenever the model list cannot be fetched.
pub const DEFAULT_MODEL: &str = "models/gemini-1.5-flash";

const GENERATE_METHOD: &str = "generateContent";

/// The credential travels in this header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound on `models` pages fetched in one listing.
const MAX_MODEL_PAGES: usize = 20;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("The model returned no text{}", .0.as_ref().map(|r| format!(" (blocked: {})", r)).unwrap_or_default())]
    EmptyResponse(Option<String>),

    #[error("API key missing. Set GOOGLE_API_KEY and restart.")]
    MissingApiKey,
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.without_url())
    }
}

/// An inline image attached to a request.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

/// One generation request: a system instruction plus prompt and image.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub image: ImagePart,
}

/// Abstraction over the hosted multimodal model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Names of the models that can generate content.
    async fn list_models(&self) -> Result<Vec<String>, AiError>;

    /// Ask the model once. No retries.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError>;
}

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: u16,
    message: String,
}

// ============================================================
// GeminiClient
// ============================================================

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at another endpoint (a proxy, or a mock in tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, AiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (code, message) = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error)
            .map(|e| (e.code, e.message))
            .unwrap_or((status.as_u16(), body));

        tracing::error!(code, message = %message, "Gemini API error");
        Err(AiError::Api { code, message })
    }
}

/// `gemini-1.5-flash` and `models/gemini-1.5-flash` name the same model.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn list_models(&self) -> Result<Vec<String>, AiError> {
        let url = format!("{}/models", self.base_url);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let mut request = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, self.api_key.as_str())
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListModelsResponse = Self::check(request.send().await?).await?.json().await?;
            names.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
                    .map(|m| m.name),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page_token.as_ref() != Some(&token) => page_token = Some(token),
                Some(token) => {
                    tracing::warn!(token = %token, "Model listing repeated its page token");
                    break;
                }
                None => break,
            }
        }

        tracing::debug!(count = names.len(), "Listed Gemini models");
        Ok(names)
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        let url = format!(
            "{}/{}:{}",
            self.base_url,
            model_path(&request.model),
            GENERATE_METHOD
        );

        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(request.system_instruction.clone()),
                    inline_data: None,
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![
                    Part {
                        text: Some(request.prompt.clone()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: request.image.mime_type.clone(),
                            data: STANDARD.encode(&request.image.data),
                        }),
                    },
                ],
            }],
        };

        tracing::info!(model = %request.model, image_bytes = request.image.data.len(), "Sending photo to Gemini");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await?;
        let response: GenerateContentResponse = Self::check(response).await?.json().await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let blocked = response.prompt_feedback.and_then(|f| f.block_reason);
            return Err(AiError::EmptyResponse(blocked));
        }

        Ok(text)
    }
}

// ============================================================
// Model catalog
// ============================================================

/// The model list, fetched once and kept for the life of the process.
///
/// A failed or empty listing is not cached; the caller gets the default
/// model and the next call tries again.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    cache: Arc<OnceCell<Vec<String>>>,
    default_model: String,
}

impl ModelCatalog {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            cache: Arc::new(OnceCell::new()),
            default_model: default_model.into(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub async fn models(&self, model: &dyn VisionModel) -> Vec<String> {
        let listed = self
            .cache
            .get_or_try_init(|| async {
                match model.list_models().await {
                    Ok(names) if !names.is_empty() => Ok(names),
                    Ok(_) => Err("no models support generateContent".to_string()),
                    Err(e) => Err(e.to_string()),
                }
            })
            .await;

        match listed {
            Ok(names) => names.clone(),
            Err(reason) => {
                tracing::warn!(
                    default = %self.default_model,
                    "Model list unavailable, using default: {}",
                    reason
                );
                vec![self.default_model.clone()]
            }
        }
    }
}
