//! Logging setup shared by the Focusbell binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The filter covers the library crate of the calling binary as well as the
/// binary itself. `RUST_LOG` overrides it entirely.
///
/// # Arguments
///
/// * `crate_name` - The library crate to enable (e.g., "focusbell_server")
/// * `binary_name` - The name of the binary (e.g., "focusbell-server")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use focusbell_shared::logger::setup_logger;
///
/// setup_logger("focusbell_server", "focusbell-server", "info");
/// ```
pub fn setup_logger(crate_name: &str, binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(crate_name, binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn default_filter(crate_name: &str, binary_name: &str, level: &str) -> String {
    format!(
        "{}={},{}={},{}={}",
        crate_name,
        level,
        env!("CARGO_PKG_NAME").replace("-", "_"),
        level,
        binary_name.replace("-", "_"),
        level
    )
}
