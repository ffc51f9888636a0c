use enum_dispatch::enum_dispatch;
use secrecy::SecretString;

use super::{CompletionRequest, CompletionResponse};
use crate::core::settings::ModelConfig;
use crate::core::{ConfigError, LmError};
use crate::providers::{DummyProvider, OpenAIProvider};

/// The backend capability the runner depends on.
///
/// One call is one round trip: the full request goes out, a single assistant
/// message comes back. Timeouts and retries belong to the implementation.
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait CompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LmError>;
}

impl<P: CompletionProvider> CompletionProvider for &P {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LmError> {
        (**self).complete(request).await
    }
}

/// Concrete backends, selected once when the client is built.
#[enum_dispatch(CompletionProvider)]
#[derive(Clone)]
pub enum LMClient {
    OpenAI(OpenAIProvider),
    Dummy(DummyProvider),
}

const LOCAL_API_KEY: &str = "EMPTY";

fn get_base_url_by_provider(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1"),
        "anthropic" => Some("https://api.anthropic.com/v1"),
        "google" => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
        "cohere" => Some("https://api.cohere.ai/compatibility/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "qwen" => Some("https://dashscope-intl.aliyuncs.com/compatible-mode/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "xai" => Some("https://api.x.ai/v1"),
        _ => None,
    }
}

fn default_api_key_env(provider: &str) -> String {
    format!("{}_API_KEY", provider.to_ascii_uppercase())
}

/// Splits `provider/model` model strings. An explicit provider wins.
fn resolve_provider(config: &ModelConfig) -> (String, String) {
    match &config.provider {
        Some(provider) => (provider.clone(), config.lm.model.clone()),
        None => match config.lm.model.split_once('/') {
            Some((provider, model_id)) if get_base_url_by_provider(provider).is_some() => {
                (provider.to_string(), model_id.to_string())
            }
            _ => ("openai".to_string(), config.lm.model.clone()),
        },
    }
}

impl LMClient {
    /// Builds the backend named by `config`, looking credentials up through `env`.
    ///
    /// Returns the client and the model identifier to send, with any
    /// `provider/` prefix removed.
    pub(crate) fn from_config_with(
        config: &ModelConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, String), ConfigError> {
        let (provider, model) = resolve_provider(config);

        if provider == "dummy" {
            return Ok((LMClient::Dummy(DummyProvider), model));
        }

        let base_url = match (&config.base_url, get_base_url_by_provider(&provider)) {
            (Some(url), _) => url.clone(),
            (None, Some(url)) => url.to_string(),
            (None, None) if provider == "local" => {
                return Err(ConfigError::MissingBaseUrl { provider });
            }
            (None, None) => return Err(ConfigError::UnknownProvider { provider }),
        };

        let api_key: SecretString = if provider == "local" {
            LOCAL_API_KEY.into()
        } else {
            let env_var = config
                .api_key_env
                .clone()
                .unwrap_or_else(|| default_api_key_env(&provider));
            env(&env_var)
                .ok_or(ConfigError::MissingCredentials { env_var })?
                .into()
        };

        let client = OpenAIProvider::new(api_key, base_url, &config.transport)?;
        Ok((LMClient::OpenAI(client), model))
    }
}
