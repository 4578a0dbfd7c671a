//! Abstraction over the service that turns an image into text.

use async_trait::async_trait;

use crate::error::ExtractError;

/// Anything that can answer a prompt about a single image.
///
/// The batch processor only depends on this trait, so the Gemini client can
/// be swapped for another backend (or a fake in tests).
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Send `prompt` and the raw image bytes, returning the generated text.
    async fn extract(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ExtractError>;

    /// Human-readable backend name, e.g. the model id.
    fn name(&self) -> &str;
}
