//! Diagnostic logging setup.
//!
//! Logs are structured `tracing` events written to stderr, so they never mix
//! with the per-item lines and summary on stdout. `RUST_LOG`, when set,
//! takes precedence over the `--log-level` flag:
//!
//! ```text
//! RUST_LOG=photo_press::process=debug photo-press convert
//! ```

use std::fmt;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("initialize logging: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Filter used when `RUST_LOG` is unset or unparsable.
fn fallback_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::default().add_directive(level.to_tracing_level().into())
}

/// Install the global subscriber. Call once, before any work starts.
pub fn init_logging(level: LogLevel) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(level));

    let fmt_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
