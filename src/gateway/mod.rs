//! Model gateway - the single choke point for outbound generation calls

pub mod client;
pub mod gemini_client;
pub mod response;
pub mod throttle;

use async_trait::async_trait;
pub use client::GatewayConfig;
pub use gemini_client::GeminiClient;
pub use response::{GatewayError, ModelCallRequest, ModelId};
pub use throttle::ThrottleTable;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Trait for text generation backends - allows for different implementations
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue one generation call and return the raw text
    async fn generate_text(&self, request: &ModelCallRequest) -> Result<String, GatewayError>;
}

/// Type-erased backend shared across the process
pub type SharedGenerator = Arc<dyn TextGenerator>;

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for Arc<T> {
    async fn generate_text(&self, request: &ModelCallRequest) -> Result<String, GatewayError> {
        (**self).generate_text(request).await
    }
}

/// Throttled, token-capped access to a text generation backend.
///
/// Build one per process and share it by `Arc`: the throttle table inside is
/// the only state shared between concurrent pipeline runs.
#[derive(Debug)]
pub struct ModelGateway<G> {
    backend: G,
    throttle: ThrottleTable,
    max_output_tokens: u32,
}

impl<G: TextGenerator> ModelGateway<G> {
    pub fn new(backend: G, config: &GatewayConfig) -> Self {
        Self {
            backend,
            throttle: ThrottleTable::new(config.delays.clone()),
            max_output_tokens: config.max_output_tokens,
        }
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }

    pub fn throttle(&self) -> &ThrottleTable {
        &self.throttle
    }

    /// Generate text with the request's model.
    ///
    /// Waits for the model's spacing, clamps `max_tokens` to the ceiling and
    /// treats an empty response as an error. Never retries.
    pub async fn generate(&self, mut request: ModelCallRequest) -> Result<String, GatewayError> {
        if request.max_tokens > self.max_output_tokens {
            debug!(
                "Clamping max_tokens {} to {}",
                request.max_tokens, self.max_output_tokens
            );
            request.max_tokens = self.max_output_tokens;
        }

        let model = request.model;
        let text = self
            .throttle
            .run(model, || self.call_backend(&request))
            .await?;

        if text.trim().is_empty() {
            return Err(GatewayError::EmptyResponse(model));
        }
        Ok(text)
    }

    /// The request's timeout starts here, after any throttle wait
    async fn call_backend(&self, request: &ModelCallRequest) -> Result<String, GatewayError> {
        match request.timeout {
            Some(limit) => match timeout(limit, self.backend.generate_text(request)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::Timeout(limit.as_secs())),
            },
            None => self.backend.generate_text(request).await,
        }
    }

    /// Generate with the primary model, then make exactly one attempt with
    /// `fallback` if the primary fails and the fallback is a different model.
    ///
    /// Returns the text together with the model that produced it.
    pub async fn generate_with_fallback(
        &self,
        request: ModelCallRequest,
        fallback: Option<ModelId>,
    ) -> Result<(String, ModelId), GatewayError> {
        let primary = request.model;
        let retry_request = fallback
            .filter(|model| *model != primary)
            .map(|model| request.for_model(model));

        match self.generate(request).await {
            Ok(text) => Ok((text, primary)),
            Err(primary_err) => match retry_request {
                Some(retry) => {
                    let model = retry.model;
                    warn!("{} failed ({}), falling back to {}", primary, primary_err, model);
                    let text = self.generate(retry).await?;
                    info!("Fallback model {} succeeded", model);
                    Ok((text, model))
                }
                None => Err(primary_err),
            },
        }
    }
}
