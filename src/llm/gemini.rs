//! Google Gemini `generateContent` client for LaTeX extraction.
//!
//! One request per capture, no retries. The API key is sent as the `key`
//! query parameter.

use super::prompts::{EXTRACT_LATEX_PROMPT, MAX_OUTPUT_TOKENS, TEMPERATURE};
use super::{ConversionResult, ConvertError, Converter, ConverterFactory};
use crate::capture::CapturedImage;
use crate::config::ServiceConfig;
use crate::credential::Credential;
use crate::safety;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::sync::Arc;

/// Request body for one conversion. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

impl ConversionRequest {
    pub fn new(image: &CapturedImage) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: EXTRACT_LATEX_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type().to_string(),
                            data: STANDARD.encode(image.bytes()),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

/// Map an HTTP status and body to LaTeX or a typed failure.
///
/// Pure function: no I/O, so every branch is testable offline.
pub fn interpret_response(status: u16, body: &str) -> Result<String, ConvertError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| json["error"]["message"].as_str().map(str::to_string));
        return Err(match message {
            Some(message) => ConvertError::Auth(message),
            None => ConvertError::HttpStatus(status),
        });
    }

    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|_| ConvertError::MalformedResponse)?;

    // First candidate; first part in it that carries text.
    let text = json["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .and_then(|parts| parts.iter().find_map(|part| part["text"].as_str()))
        .ok_or(ConvertError::MalformedResponse)?;

    ConversionResult::from_model_text(text).into_latex()
}

pub struct GeminiClient {
    http: reqwest::Client,
    service: ServiceConfig,
    credential: Credential,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, service: ServiceConfig, credential: Credential) -> Self {
        Self {
            http,
            service,
            credential,
        }
    }
}

#[async_trait]
impl Converter for GeminiClient {
    async fn convert(&self, image: CapturedImage) -> Result<String, ConvertError> {
        let request = ConversionRequest::new(&image);

        log::info!("[GEMINI] Model: {}", self.service.model);
        log::info!(
            "[GEMINI] Sending {} ({} bytes)",
            image.mime_type(),
            image.len()
        );

        let start = std::time::Instant::now();

        let response = self
            .http
            .post(self.service.generate_content_url())
            .query(&[("key", self.credential.expose())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = safety::scrub(&e.without_url().to_string(), Some(&self.credential));
                log::error!("[GEMINI] HTTP request failed: {}", message);
                ConvertError::Transport(message)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let message = safety::scrub(&e.without_url().to_string(), Some(&self.credential));
            log::error!("[GEMINI] Failed to read response body: {}", message);
            ConvertError::Transport(message)
        })?;

        log::info!(
            "[GEMINI] {} in {}ms ({} bytes)",
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        let result = interpret_response(status.as_u16(), &body);
        match &result {
            Ok(latex) => log::info!("[GEMINI] Extracted {} chars of LaTeX", latex.len()),
            Err(ConvertError::NoMathFound) => log::info!("[GEMINI] No math in image"),
            Err(e) => {
                let preview: String = body.chars().take(200).collect();
                log::warn!(
                    "[GEMINI] {} — raw: {}",
                    e,
                    safety::scrub(&preview, Some(&self.credential))
                );
            }
        }
        result
    }
}

/// Builds a [`GeminiClient`] per session, sharing one connection pool.
pub struct GeminiConverterFactory {
    http: reqwest::Client,
    service: ServiceConfig,
}

impl GeminiConverterFactory {
    pub fn new(service: ServiceConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            service,
        }
    }
}

impl ConverterFactory for GeminiConverterFactory {
    fn converter(&self, credential: Credential) -> Arc<dyn Converter> {
        Arc::new(GeminiClient::new(
            self.http.clone(),
            self.service.clone(),
            credential,
        ))
    }
}
