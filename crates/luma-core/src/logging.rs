//! Logger initialisation.
//!
//! The crates only emit through the `tracing` facade; installing a subscriber
//! is left to the application. This module offers the default one.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "LUMA_LOG";

/// Logger configuration.
///
/// `filter` follows the `EnvFilter` directive syntax (e.g. `"info"`,
/// `"luma=debug,luma_gl=trace"`).
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            ansi: true,
        }
    }
}

static INIT: Once = Once::new();

/// Install the global `tracing` subscriber once.
///
/// Subsequent calls are ignored, as is the case where another subscriber was
/// already installed by the host application.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(config.filter.as_deref());

        let installed = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&filter))
            .with_ansi(config.ansi)
            .with_target(true)
            .try_init()
            .is_ok();

        if installed {
            tracing::debug!(%filter, "logging initialized");
        }
    });
}

/// Filter precedence: explicit config, `LUMA_LOG`, `RUST_LOG`, then `info`.
fn resolve_filter(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_owned)
        .or_else(|| std::env::var(LOG_ENV).ok())
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_owned())
}
