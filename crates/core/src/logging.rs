//! Tracing setup.
//!
//! Configure via the `RUST_LOG` environment variable:
//! - `RUST_LOG=debug` - all debug logs, including geometry decisions
//! - `RUST_LOG=cropfit_core::session=debug` - module-level filtering
//!
//! Logs are also written to the platform data directory
//! (`~/.local/share/cropfit/logs/cropfit.log` on Linux) with daily rotation.

use crate::settings::project_dirs;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Creates and returns the log directory.
fn ensure_logs_dir() -> std::io::Result<PathBuf> {
    let dir = project_dirs()
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .ok_or_else(|| std::io::Error::other("no home directory"))?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Initialize tracing subscriber with console and file logging.
///
/// Console output respects `RUST_LOG` (default `warn`) and goes to stderr
/// so it never mixes with machine-readable stdout. The file layer always
/// records at debug level.
pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(console_filter);

    let file_layer = match ensure_logs_dir() {
        Ok(logs_dir) => {
            let file_appender = tracing_appender::rolling::daily(logs_dir, "cropfit.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    };

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
