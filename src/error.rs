//! Error types for the studio.

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred during transformation.";

/// Errors that can occur while loading, transforming or saving an image.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    /// No API key was configured.
    #[error("API Key is missing. Please ensure it is configured.")]
    MissingApiKey,

    /// API returned an error response.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// Network or HTTP error.
    #[cfg(feature = "gemini")]
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    /// The service answered without any image part.
    #[error("Failed to receive an edited image from the AI. It might have only returned text.")]
    NoImage,

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading the upload or saving the download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation not allowed in the current view phase.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}

impl StudioError {
    /// Returns the message to surface to the user.
    ///
    /// Falls back to [`GENERIC_FAILURE`] when the error has nothing to say.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        }
    }
}

/// Result type alias for studio operations.
pub type Result<T> = std::result::Result<T, StudioError>;

/// Truncates an error body so huge HTML pages don't end up in the UI.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    const MAX_LEN: usize = 500;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_LEN).collect();
    out.push_str("...");
    out
}
