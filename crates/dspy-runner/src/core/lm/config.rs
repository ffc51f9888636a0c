use bon::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inference parameters copied into every completion request.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct LMConfig {
    /// Model identifier sent to the backend. Accepts `provider/model` to infer base URL.
    #[builder(default = "gpt-4o-mini".to_string())]
    pub model: String,
    /// Sampling temperature. Higher values increase randomness.
    #[builder(default = 0.7)]
    pub temperature: f32,
    /// Maximum tokens requested for the completion.
    #[builder(default = 512)]
    pub max_tokens: u32,
    /// Ask the backend to enforce structured labels through `response_format`.
    /// When off, labels are still decoded from the raw text after the fact.
    #[builder(default = true)]
    pub use_structured: bool,
}

impl Default for LMConfig {
    fn default() -> Self {
        LMConfig::builder().build()
    }
}

/// HTTP transport tuning handed to the backend constructor.
#[derive(Clone, Debug, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Whole-request timeout. Long prefills on self-hosted servers need headroom.
    #[builder(default = 600)]
    pub timeout_secs: u64,
    #[builder(default = 10)]
    pub connect_timeout_secs: u64,
    /// Idle connections kept per host. `0` forces a fresh connection per request.
    #[builder(default = 0)]
    pub max_idle_connections: usize,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::builder().build()
    }
}
