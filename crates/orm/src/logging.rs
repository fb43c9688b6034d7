//! Structured logging setup
//!
//! The ORM emits `tracing` events under the `astra_orm` target: statement
//! execution at `debug`, pool saturation and discarded connections at `warn`,
//! connection failures at `error`. Hosts that do not install their own
//! subscriber can use [`init_logging`].

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{OrmError, OrmResult};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter used when no `env_filter` is set (e.g. "info")
    pub level: String,
    /// JSON lines instead of plain text
    pub json_format: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Full filter directive, e.g. "astra_orm=debug,sqlx=warn"
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            include_location: false,
            env_filter: Some("astra_orm=info,sqlx=warn".to_string()),
        }
    }

    /// Every executed statement is logged.
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            include_location: true,
            env_filter: Some("astra_orm=debug,sqlx=info".to_string()),
        }
    }

    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            include_location: false,
            env_filter: Some("astra_orm=error".to_string()),
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> OrmResult<EnvFilter> {
        let directive = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directive))
            .map_err(|e| OrmError::configuration(format!("Invalid log filter [{}]: {}", directive, e)))
    }
}

/// Install a global subscriber.
///
/// Fails with a configuration error if the filter is malformed or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> OrmResult<()> {
    let filter = config.filter()?;
    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };
    installed.map_err(|e| OrmError::configuration(format!("Logging already initialized: {}", e)))?;

    tracing::info!(
        target: "astra_orm",
        "logging initialized (level: {}, format: {})",
        config.level,
        if config.json_format { "json" } else { "text" }
    );
    Ok(())
}
