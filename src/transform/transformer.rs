//! Transformer trait and response parts.

use crate::error::Result;
use crate::image::EncodedImage;
use async_trait::async_trait;
use std::sync::Arc;

/// A service that restyles an image.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Sends `image` to the service and returns the edited image.
    ///
    /// Exactly one remote call per invocation. No retries.
    async fn transform(&self, image: &EncodedImage) -> Result<EncodedImage>;

    /// Returns the name of this transformer for display.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: ImageTransformer + ?Sized> ImageTransformer for Arc<T> {
    async fn transform(&self, image: &EncodedImage) -> Result<EncodedImage> {
        (**self).transform(image).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// One part of a generated response, in service order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Text commentary.
    Text(String),
    /// Inline image data.
    Image(EncodedImage),
}

/// Picks the first image part. Text parts and later images are ignored.
pub fn first_image(parts: impl IntoIterator<Item = ResponsePart>) -> Option<EncodedImage> {
    parts.into_iter().find_map(|part| match part {
        ResponsePart::Image(image) => Some(image),
        ResponsePart::Text(_) => None,
    })
}
