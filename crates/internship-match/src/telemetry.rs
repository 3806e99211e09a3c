use crate::config::TelemetryConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}'")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Picks the active filter directive: a non-empty `RUST_LOG` wins over the configured level.
pub(crate) fn resolve_directive(config: &TelemetryConfig, rust_log: Option<String>) -> String {
    rust_log
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| config.log_level.clone())
}

pub(crate) fn build_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the compact process-wide subscriber used by the service and the CLI commands.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let directive = resolve_directive(config, std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = build_filter(&directive)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)?;

    tracing::debug!(%directive, "telemetry initialised");
    Ok(())
}
