//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is human-readable by default or JSON lines when
//! [`LogOptions::json`] is set. File output rotates daily through
//! `tracing-appender`. `RUST_LOG` always wins over the configured level.

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::PtError;

/// Settings for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default level if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: String,
    /// Optional directory for daily-rotating log files.
    pub dir: Option<String>,
    /// Log file prefix.
    pub module_name: String,
    /// Emit JSON lines on the console instead of the pretty format.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            module_name: "pt-runner".to_string(),
            json: false,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Call once at program start. A second call fails with [`PtError::Config`]
/// instead of panicking, so tests and embedders can call it defensively.
pub fn init_logging(opts: &LogOptions) -> Result<(), PtError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opts.level));

    let console_layer = if opts.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file_layer = opts.dir.as_ref().map(|dir| {
        let appender = tracing_appender::rolling::daily(dir, &opts.module_name);
        fmt::layer()
            .with_writer(appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PtError::Config(format!("logging already initialized: {e}")))
}
