//! Gemini generateContent backend

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{OcrBackend, OcrError, ReceiptImage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenated text parts of every candidate
fn answer_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect()
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl OcrBackend for GeminiBackend {
    async fn generate(&self, model: &str, prompt: &str, image: &ReceiptImage) -> Result<String, OcrError> {
        let failed = |message: String| OcrError::Backend {
            model: model.to_string(),
            message,
        };

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                        }
                    }
                ]
            }]
        });

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(failed(format!("status {}: {}", status, detail.trim())));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid response body: {}", e)))?;

        let text = answer_text(parsed);
        if text.trim().is_empty() {
            return Err(failed("empty answer".to_string()));
        }
        Ok(text)
    }
}
