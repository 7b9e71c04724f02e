use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Env var consulted when `RUST_LOG` is unset.
pub const LOG_ENV: &str = "FLAGENV_LOG";

/// Pick the filter directive: `-v` wins, then `RUST_LOG`, then
/// `FLAGENV_LOG`, then the configured fallback. Blank variables count as
/// unset.
pub fn resolve_filter<F>(configured: &str, verbose: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if verbose {
        return "debug".to_string();
    }
    let non_blank = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
    non_blank("RUST_LOG")
        .or_else(|| non_blank(LOG_ENV))
        .unwrap_or_else(|| configured.to_string())
}

/// Install the global tracing subscriber. Safe to call more than once; only
/// the first call takes effect.
pub fn init(configured: &str, format: LogFormat, verbose: bool) {
    let directive = resolve_filter(configured, verbose, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so command output on stdout stays machine-readable.
    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
