//! Gateway configuration

use crate::gateway::ModelId;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the model gateway and its HTTP backend
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API key for the hosted model
    pub api_key: Option<String>,

    /// Base URL of the generation API
    ///
    /// If not provided, defaults to the public Gemini endpoint.
    pub endpoint: Option<String>,

    /// Timeout for a single HTTP request in seconds
    pub timeout_secs: u64,

    /// Output token ceiling applied to every request
    pub max_output_tokens: u32,

    /// Minimum spacing between calls to the same model
    pub delays: HashMap<ModelId, Duration>,
}

impl GatewayConfig {
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const MAX_OUTPUT_TOKENS: u32 = 48192;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_delay(mut self, model: ModelId, delay: Duration) -> Self {
        self.delays.insert(model, delay);
        self
    }

    /// Drop all throttling (tests and offline runs)
    pub fn without_throttle(mut self) -> Self {
        for model in ModelId::ALL {
            self.delays.insert(model, Duration::ZERO);
        }
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(Self::DEFAULT_ENDPOINT)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            timeout_secs: 240,
            max_output_tokens: Self::MAX_OUTPUT_TOKENS,
            delays: ModelId::ALL
                .iter()
                .map(|m| (*m, Duration::from_millis(m.default_delay_ms())))
                .collect(),
        }
    }
}
