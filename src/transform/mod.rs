//! Remote image transformation.

#[cfg(feature = "gemini")]
mod gemini;
mod transformer;

#[cfg(feature = "gemini")]
pub use gemini::GeminiTransformer;
pub use transformer::{first_image, ImageTransformer, ResponsePart};
