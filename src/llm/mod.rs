//! Conversion of captured images to LaTeX by a remote vision model.
//!
//! The pipeline only sees the [`Converter`] trait. A fresh converter is
//! built for every session by a [`ConverterFactory`], from the credential
//! read at that session's start.

pub mod gemini;
pub mod prompts;

pub use gemini::{interpret_response, ConversionRequest, GeminiClient, GeminiConverterFactory};

use crate::capture::CapturedImage;
use crate::credential::Credential;
use async_trait::async_trait;
use std::sync::Arc;

/// What a well-formed service reply said about the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Text(String),
    NoMathFound,
}

impl ConversionResult {
    /// Classify raw model output: trimmed, then compared to the sentinel.
    pub fn from_model_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed == prompts::NO_MATH_SENTINEL {
            Self::NoMathFound
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn into_latex(self) -> Result<String, ConvertError> {
        match self {
            Self::Text(latex) => Ok(latex),
            Self::NoMathFound => Err(ConvertError::NoMathFound),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-success status with no structured error body.
    #[error("API Error: HTTP {0}")]
    HttpStatus(u16),

    /// Failure message reported by the service itself.
    #[error("API Error: {0}")]
    Auth(String),

    #[error("Invalid response from Gemini API")]
    MalformedResponse,

    #[error("No LaTeX content found in the image")]
    NoMathFound,
}

#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(&self, image: CapturedImage) -> Result<String, ConvertError>;
}

pub trait ConverterFactory: Send + Sync {
    fn converter(&self, credential: Credential) -> Arc<dyn Converter>;
}
