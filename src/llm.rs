//! Generation provider abstraction
//!
//! The session core talks to the provider only through [`GenerationGateway`]:
//! one text call and one image call, nothing else.

mod error;
mod gemini;
mod types;


pub use error::{GatewayError, GatewayErrorKind};
pub use gemini::{GeminiGateway, GeminiSettings};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for generation providers
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Request a text completion. `Ok(None)` means the provider answered
    /// with nothing usable.
    async fn generate_text(&self, request: &TextRequest) -> Result<Option<String>, GatewayError>;

    /// Request an image. Returns a `data:` URI, or `Ok(None)` when the
    /// response carried no inline image.
    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GatewayError>;

    /// Model used for text completions
    fn text_model(&self) -> &str;

    /// Model used for image generation
    fn image_model(&self) -> &str;
}

#[async_trait]
impl<T: GenerationGateway + ?Sized> GenerationGateway for Arc<T> {
    async fn generate_text(&self, request: &TextRequest) -> Result<Option<String>, GatewayError> {
        (**self).generate_text(request).await
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GatewayError> {
        (**self).generate_image(prompt).await
    }

    fn text_model(&self) -> &str {
        (**self).text_model()
    }

    fn image_model(&self) -> &str {
        (**self).image_model()
    }
}

/// Logging wrapper for generation gateways
pub struct LoggingGateway {
    inner: Arc<dyn GenerationGateway>,
}

impl LoggingGateway {
    pub fn new(inner: Arc<dyn GenerationGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl GenerationGateway for LoggingGateway {
    async fn generate_text(&self, request: &TextRequest) -> Result<Option<String>, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_text(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.inner.text_model(),
                    duration_ms = %duration.as_millis(),
                    history_turns = request.history.len(),
                    force_language = request.force_language,
                    empty = text.is_none(),
                    "Text generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.inner.text_model(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Text generation failed"
                );
            }
        }

        result
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<String>, GatewayError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_image(prompt).await;
        let duration = start.elapsed();

        match &result {
            Ok(image) => {
                tracing::info!(
                    model = %self.inner.image_model(),
                    duration_ms = %duration.as_millis(),
                    has_image = image.is_some(),
                    "Image generation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.inner.image_model(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Image generation failed"
                );
            }
        }

        result
    }

    fn text_model(&self) -> &str {
        self.inner.text_model()
    }

    fn image_model(&self) -> &str {
        self.inner.image_model()
    }
}
