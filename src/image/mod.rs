//! Image encoding and loading.

mod loader;
mod types;

pub use loader::{FileLoader, FALLBACK_MIME_TYPE};
pub use types::{EncodedImage, ImageFormat, DEFAULT_MIME_TYPE};
