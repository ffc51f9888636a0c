use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "dspy_runner=info";
static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("invalid tracing filter directive `{directive}`: {source}")]
    InvalidFilter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs process-global tracing output on stderr.
///
/// Uses `RUST_LOG` when present and falls back to `dspy_runner=info`.
/// Repeated calls are no-ops after the first successful init. Stdout is left
/// alone so run results can be piped.
pub fn init_tracing() -> Result<(), TelemetryInitError> {
    init_tracing_with(DEFAULT_FILTER)
}

/// Like [`init_tracing`], with a caller-chosen fallback directive.
pub fn init_tracing_with(default_directive: &str) -> Result<(), TelemetryInitError> {
    if TRACING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = resolve_filter(default_directive)?;
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    let _ = TRACING_INITIALIZED.set(());
    Ok(())
}

fn resolve_filter(default_directive: &str) -> Result<EnvFilter, TelemetryInitError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive).map_err(|source| {
            TelemetryInitError::InvalidFilter {
                directive: default_directive.to_string(),
                source,
            }
        }),
    }
}

/// Cuts `value` to at most `max_chars` characters for log fields.
pub fn truncate(value: &str, max_chars: usize) -> &str {
    if value.chars().count() <= max_chars {
        value
    } else {
        let cutoff = value
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(value.len());
        &value[..cutoff]
    }
}
