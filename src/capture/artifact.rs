//! Transient file the region picker writes into.
//!
//! The file is removed when the guard drops, so every exit path of a
//! capture (success, read failure, cancellation, spawn error) cleans up.

use super::{CaptureError, CaptureOutcome, CapturedImage};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct CaptureArtifact {
    path: PathBuf,
}

impl CaptureArtifact {
    /// Reserve a unique `latexscan_capture_<uuid>.png` path inside `dir`.
    ///
    /// Anything already sitting at that path is removed first.
    pub fn new_in(dir: &Path) -> Self {
        let path = dir.join(format!("latexscan_capture_{}.png", Uuid::new_v4()));
        remove_quietly(&path);
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the finished artifact and delete it.
    ///
    /// A missing or empty file means the user cancelled the picker.
    pub async fn take(self) -> Result<CaptureOutcome, CaptureError> {
        let read = tokio::fs::read(&self.path).await;
        drop(self);

        match read {
            Ok(bytes) if bytes.is_empty() => Ok(CaptureOutcome::Cancelled),
            Ok(bytes) => CapturedImage::from_bytes(bytes).map(CaptureOutcome::ImageBytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(CaptureOutcome::Cancelled),
            Err(e) => Err(CaptureError::ReadFailed(e)),
        }
    }
}

impl Drop for CaptureArtifact {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("[CAPTURE] Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("[CAPTURE] Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn take_reads_then_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = CaptureArtifact::new_in(dir.path());
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, png_bytes()).unwrap();

        let outcome = artifact.take().await.unwrap();
        assert!(matches!(outcome, CaptureOutcome::ImageBytes(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_file_is_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = CaptureArtifact::new_in(dir.path());
        assert_eq!(artifact.take().await.unwrap(), CaptureOutcome::Cancelled);
    }

    #[tokio::test]
    async fn empty_file_is_cancellation_and_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = CaptureArtifact::new_in(dir.path());
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, b"").unwrap();

        assert_eq!(artifact.take().await.unwrap(), CaptureOutcome::Cancelled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unreadable_image_is_still_removed() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = CaptureArtifact::new_in(dir.path());
        let path = artifact.path().to_path_buf();
        std::fs::write(&path, b"not an image").unwrap();

        let result = artifact.take().await;
        assert!(matches!(result, Err(CaptureError::UnrecognizedImage)));
        assert!(!path.exists());
    }

    #[test]
    fn dropping_unused_artifact_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = CaptureArtifact::new_in(dir.path());
            std::fs::write(artifact.path(), b"partial").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
