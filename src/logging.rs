//! Log subscriber setup for the command-line tool.

use crate::config::{Settings, LOG_ENV};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Logs go to stderr so reports on stdout
/// stay clean. Calling this twice is harmless.
pub fn init_logging(settings: &Settings) {
    let env = std::env::var(LOG_ENV)
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok());
    let directive = settings.log_filter(env);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();

    tracing::debug!("Logging initialized with filter: {}", directive);
}
