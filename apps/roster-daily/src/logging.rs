//! Tracing subscriber setup.

use roster_sync::LoggingConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. JSON output is
/// used when the configured format is `json`.
pub fn init_logging(config: &LoggingConfig) {
    let filter_layer =
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level)) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("FATAL: Failed to create log filter: {e}");
                std::process::exit(2);
            }
        };

    if config.format.eq_ignore_ascii_case("json") {
        let fmt_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true);
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter_layer)
            .init();
    }

    tracing::debug!(level = %config.level, format = %config.format, "Logging initialized");
}
