//! Reads local files into encoded images.

use crate::error::Result;
use crate::image::types::{EncodedImage, ImageFormat};
use std::path::Path;

/// MIME type used when neither content nor extension identify the file.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Loads local files as data-URL encoded images.
///
/// No type or size restriction is applied; any readable file is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Creates a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Reads `path` and encodes its contents.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<EncodedImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = detect_mime_type(path, &bytes);

        tracing::debug!(
            path = %path.display(),
            size_bytes = bytes.len(),
            mime_type,
            "loaded image file"
        );

        Ok(EncodedImage::from_bytes(mime_type, &bytes))
    }
}

/// Sniffs magic bytes first, then falls back to the file extension.
fn detect_mime_type(path: &Path, bytes: &[u8]) -> &'static str {
    ImageFormat::from_magic_bytes(bytes)
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .map(|format| format.mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE)
}
