use std::time::Duration;

use async_trait::async_trait;
use common::config::GeminiSettings;
use common::error::AnnotationError;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::traits::TextGenerator;

const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts concatenated.
    pub fn text(&self) -> Result<String, AnnotationError> {
        let content = self
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .ok_or_else(|| AnnotationError::Malformed("no candidate content".to_string()))?;

        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(AnnotationError::Empty);
        }
        Ok(text)
    }
}

/// Google Gemini `generateContent` over REST.
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("breakout-scanner/0.1")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!(
                "{}/v1beta/models/{}:generateContent",
                settings.base_url.trim_end_matches('/'),
                settings.model
            ),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, AnnotationError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 200,
                temperature: 0.4,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnnotationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotationError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AnnotationError::Malformed(e.to_string()))?;

        payload.text()
    }
}
