//! Screen region capture: public API.
//!
//! This module owns the interactive region picker and the captured image
//! type. External code should only use the items exported here.

mod artifact;
mod picker;

pub use artifact::CaptureArtifact;
pub use picker::InteractiveCapture;

use async_trait::async_trait;
use std::sync::Arc;

/// What the user produced with the region picker.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    ImageBytes(CapturedImage),
    /// The user dismissed the picker. Not an error.
    Cancelled,
}

/// An image read from a finished capture, with its sniffed mime type.
///
/// Bytes are shared, so handing the image to a background task is cheap.
#[derive(Clone, PartialEq)]
pub struct CapturedImage {
    bytes: Arc<[u8]>,
    mime_type: &'static str,
}

impl CapturedImage {
    /// Wrap raw bytes, rejecting anything that isn't a known image format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CaptureError> {
        let format = image::guess_format(&bytes).map_err(|_| CaptureError::UnrecognizedImage)?;
        Ok(Self {
            bytes: bytes.into(),
            mime_type: format.to_mime_type(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The OS-provided interactive region picker.
///
/// Implementations must only return `ImageBytes` once the artifact is
/// fully written, and must remove any backing file before returning.
#[async_trait]
pub trait RegionCapture: Send + Sync {
    async fn capture_region(&self) -> Result<CaptureOutcome, CaptureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Screen capture failed: no region picker available on this platform (set LATEXSCAN_CAPTURE_COMMAND)")]
    NoPicker,

    #[error("Screen capture failed: `{0}` not found on PATH")]
    ToolNotFound(String),

    #[error("Screen capture failed: {0}")]
    Spawn(String),

    #[error("Failed to read captured image")]
    ReadFailed(#[source] std::io::Error),

    #[error("Captured file is not a recognised image")]
    UnrecognizedImage,
}
