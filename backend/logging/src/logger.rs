//! Structured Logger
//!
//! Wraps `tracing` to provide console output, optional file rotation
//! (NDJSON), and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global structured logger.
///
/// `RUST_LOG` overrides `level`. With a `log_dir`, a JSON layer writes
/// `cmdbridge.log.YYYY-MM-DD` files there as well. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "cmdbridge.log");
        fmt::layer().json().with_writer(file_appender).with_ansi(false)
    });

    // Console goes to stderr so command output on stdout stays clean.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
