#![warn(missing_docs)]
//! Vogue Studio - restyle portraits into a Vogue cowboy look.
//!
//! A portrait goes in, a fixed styling instruction goes with it to a
//! Gemini image model, and the edited portrait comes back. The [`Studio`]
//! controller tracks the three-phase flow (upload, preview, result) so any
//! front-end can render it.
//!
//! # Quick Start
//!
//! ```no_run
//! use vogue_studio::{GeminiTransformer, Studio, StudioConfig, TransformOutcome};
//!
//! #[tokio::main]
//! async fn main() -> vogue_studio::Result<()> {
//!     let transformer = GeminiTransformer::new(StudioConfig::from_env());
//!     let studio = Studio::new(transformer);
//!
//!     studio.upload("portrait.jpg").await?;
//!     match studio.transform().await {
//!         TransformOutcome::Completed => {
//!             studio.download(".").await?;
//!         }
//!         TransformOutcome::Failed(message) => eprintln!("{message}"),
//!         _ => {}
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini` (default): Gemini (Google) HTTP client
//! - `cli`: Command-line interface

pub mod config;
mod error;
pub mod image;
pub mod studio;
pub mod transform;

// Re-export error types at crate root
pub use error::{Result, StudioError, GENERIC_FAILURE};

pub use config::{GeminiModel, StudioConfig, STYLE_INSTRUCTION};
pub use image::{EncodedImage, FileLoader, ImageFormat};
pub use studio::{Studio, StudioState, TransformOutcome, ViewPhase, DOWNLOAD_FILE_NAME};
pub use transform::{ImageTransformer, ResponsePart};

#[cfg(feature = "gemini")]
pub use transform::GeminiTransformer;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::StudioConfig;
    pub use crate::error::{Result, StudioError};
    pub use crate::image::EncodedImage;
    pub use crate::studio::{Studio, StudioState, TransformOutcome, ViewPhase};
    pub use crate::transform::ImageTransformer;

    #[cfg(feature = "gemini")]
    pub use crate::transform::GeminiTransformer;
}
