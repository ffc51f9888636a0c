pub mod chat;
pub mod client_registry;
pub mod config;
pub mod request;
pub mod usage;

pub use chat::*;
pub use client_registry::*;
pub use config::*;
pub use request::*;
pub use usage::*;

use crate::core::ConfigError;
use crate::core::settings::ModelConfig;

/// A ready-to-use language model: the selected backend plus the inference
/// parameters every request is built from.
#[derive(Clone)]
pub struct LM {
    pub client: LMClient,
    pub config: LMConfig,
}

impl LM {
    /// Builds the backend described by `model`, reading the API key from the
    /// environment variable the config names.
    pub fn from_config(model: &ModelConfig) -> Result<Self, ConfigError> {
        Self::from_config_with(model, |name| std::env::var(name).ok())
    }

    pub(crate) fn from_config_with(
        model: &ModelConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let (client, model_id) = LMClient::from_config_with(model, env)?;
        let mut config = model.lm.clone();
        config.model = model_id;
        Ok(Self { client, config })
    }
}
