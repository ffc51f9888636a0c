use std::{error::Error as StdError, path::PathBuf, time::Duration};

/// Coarse error classification, attached to failed-turn logs.
///
/// Use [`LmError::class`] to get this. `BadResponse` means the backend
/// answered with something we could not read.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorClass {
    /// The request itself was malformed.
    BadRequest,
    /// Transient failure (network, rate limit, timeout, server 5xx).
    Temporary,
    /// The backend responded, but the payload was unusable.
    BadResponse,
    /// A bug in the calling code or an unexpected provider failure.
    Internal,
}

/// The backend failed before returning a usable response.
///
/// Every variant is recovered at the per-turn boundary by the conversation
/// runner: the turn records an empty output and the conversation moves on.
#[derive(Debug, thiserror::Error)]
pub enum LmError {
    /// Could not reach the provider endpoint (DNS, connection refused, etc.).
    #[error("could not reach {endpoint}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider rejected the request for exceeding its rate limit.
    #[error("rate limited by provider: {message}")]
    RateLimit { message: String },

    /// The provider returned an API error payload.
    #[error("provider rejected the request: {message}")]
    Api {
        kind: Option<String>,
        message: String,
    },

    /// The request exceeded the configured timeout.
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The provider answered, but the body could not be turned into a message.
    #[error("malformed response from provider: {reason}")]
    MalformedResponse { reason: String },

    /// A provider-specific error that doesn't fit the other categories.
    #[error("provider error from {provider}: {message}")]
    Provider {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl LmError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Network { .. } => ErrorClass::Temporary,
            Self::RateLimit { .. } => ErrorClass::Temporary,
            Self::Api { .. } => ErrorClass::BadRequest,
            Self::Timeout { .. } => ErrorClass::Temporary,
            Self::MalformedResponse { .. } => ErrorClass::BadResponse,
            Self::Provider { .. } => ErrorClass::Internal,
        }
    }
}

/// A tool schema list could not be resolved. Fatal before fan-out.
#[derive(Debug, thiserror::Error)]
pub enum ToolSchemaError {
    #[error("could not read tool schemas from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tool schema file {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tool schema file {path} must contain a JSON array")]
    NotAList { path: PathBuf },

    #[error("tool schema #{index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("tool schema #{index} has unsupported type `{kind}`")]
    UnsupportedType { index: usize, kind: String },

    #[error("tool schema #{index} is missing `function.name`")]
    MissingName { index: usize },

    #[error("tool schema #{index} has an invalid `function` object")]
    InvalidFunction {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Initialization failed. Surfaced before any conversation work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing credentials: environment variable `{env_var}` is not set")]
    MissingCredentials { env_var: String },

    #[error("provider `{provider}` requires an explicit base_url")]
    MissingBaseUrl { provider: String },

    #[error("unsupported provider `{provider}`")]
    UnknownProvider { provider: String },

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("failed to build HTTP client")]
    HttpClient {
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    ToolSchema(#[from] ToolSchemaError),
}
