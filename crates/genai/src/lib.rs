//! Client for the external generative-AI image API.
//!
//! [`ImageGenerator`] is the seam the HTTP layer calls through;
//! [`GeminiClient`] implements it against the Gemini `generateContent`
//! endpoint using [`reqwest`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when neither the template version nor the config names one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Errors from the generative-AI layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response parsed but carried no image part.
    #[error("No image data in response: {0}")]
    MissingImage(&'static str),

    #[error("Invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// One image-to-image generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub prompt: &'a str,
    pub image: &'a [u8],
    pub mime_type: &'a str,
    /// Overrides the client's default model.
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    /// MIME type reported by the API, if any.
    pub mime_type: Option<String>,
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<GeneratedImage, GeminiError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateContentBody<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: RequestInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(alias = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(alias = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

fn request_body<'a>(prompt: &'a str, image: &[u8], mime_type: &'a str) -> GenerateContentBody<'a> {
    GenerateContentBody {
        contents: [Content {
            parts: [
                RequestPart::Text { text: prompt },
                RequestPart::InlineData {
                    inline_data: RequestInlineData {
                        mime_type,
                        data: STANDARD.encode(image),
                    },
                },
            ],
        }],
    }
}

/// Take the first inline image part of the first candidate.
fn extract_image(response: GenerateContentResponse) -> Result<GeneratedImage, GeminiError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GeminiError::MissingImage("no candidates"))?;
    let content = candidate
        .content
        .ok_or(GeminiError::MissingImage("candidate has no content"))?;
    let inline = content
        .parts
        .into_iter()
        .find_map(|p| p.inline_data)
        .ok_or(GeminiError::MissingImage("no inline_data part"))?;

    Ok(GeneratedImage {
        bytes: STANDARD.decode(inline.data.trim())?,
        mime_type: inline.mime_type,
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl GeminiClient {
    /// * `base_url` - API host, e.g. [`DEFAULT_BASE_URL`].
    pub fn new(base_url: String, api_key: String, default_model: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key, default_model)
    }

    /// Reuse an existing [`reqwest::Client`] (and its timeout settings).
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        default_model: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<GeneratedImage, GeminiError> {
        let model = request
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model);
        let body = request_body(request.prompt, request.image, request.mime_type);

        tracing::debug!(model, image_bytes = request.image.len(), "Calling generateContent");

        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        extract_image(response.json::<GenerateContentResponse>().await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
