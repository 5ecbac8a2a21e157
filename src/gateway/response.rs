//! Model call request and error types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error types for model gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model {0} returned an empty response")]
    EmptyResponse(ModelId),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Missing API key: set GEMINI_API_KEY")]
    MissingApiKey,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Http(format!("request timed out: {}", err))
        } else {
            GatewayError::Http(err.to_string())
        }
    }
}

/// Hosted text-generation models the gateway knows how to throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gemini-2.5-flash-lite", alias = "flash-lite")]
    FlashLite,
    #[serde(rename = "gemini-2.5-flash", alias = "flash")]
    Flash,
    #[serde(rename = "gemini-2.5-pro", alias = "pro")]
    Pro,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::FlashLite, ModelId::Flash, ModelId::Pro];

    /// Identifier used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::FlashLite => "gemini-2.5-flash-lite",
            ModelId::Flash => "gemini-2.5-flash",
            ModelId::Pro => "gemini-2.5-pro",
        }
    }

    /// Default minimum spacing between two calls to this model, in milliseconds
    pub fn default_delay_ms(&self) -> u64 {
        match self {
            ModelId::FlashLite => 6_000,
            ModelId::Flash => 10_000,
            ModelId::Pro => 15_000,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound generation call. Built per call, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCallRequest {
    pub model: ModelId,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_instruction: Option<String>,
    /// Limit on the backend call alone, excluding any throttle wait
    pub timeout: Option<Duration>,
}

impl ModelCallRequest {
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
            max_tokens: u32::MAX,
            system_instruction: None,
            timeout: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Same request aimed at another model
    pub fn for_model(&self, model: ModelId) -> Self {
        Self {
            model,
            ..self.clone()
        }
    }
}
