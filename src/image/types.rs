//! Core image types: formats and data-URL encoded images.

use crate::error::{Result, StudioError};
use base64::Engine;
use std::path::Path;

/// MIME type assumed when an encoded image doesn't declare one.
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// An image carried as MIME type plus base64 payload.
///
/// Renders as a data URL (`data:image/png;base64,...`), the same shape a
/// browser file reader produces and the Gemini API returns in `inlineData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    mime_type: String,
    data: String,
}

impl EncodedImage {
    /// Creates an encoded image from an already base64-encoded payload.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encodes raw bytes with the given MIME type.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Splits a data URL into MIME type and payload.
    ///
    /// Input without a `data:<mime>;` header is taken as bare base64 and
    /// labelled [`DEFAULT_MIME_TYPE`].
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        let mime_type = input
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .filter(|mime| !mime.is_empty() && !mime.contains(','))
            .unwrap_or(DEFAULT_MIME_TYPE);

        let data = match input.split_once(',') {
            Some((_, payload)) => payload,
            None => input,
        };

        Self::new(mime_type, data)
    }

    /// Returns the declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the raw base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the format matching the declared MIME type, if known.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        self.to_string()
    }

    /// Decodes the base64 payload.
    ///
    /// Tolerates embedded whitespace and missing padding.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let cleaned: String = self
            .data
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
            return Ok(bytes);
        }

        base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(&cleaned)
            .map_err(|e| StudioError::Decode(e.to_string()))
    }

    /// Decodes the payload and writes it to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.decode()?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

impl std::fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
