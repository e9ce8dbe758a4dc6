//! Log initialization and setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global log subscriber
///
/// The filter comes from the `LOG_FILTER` environment variable and defaults to
/// `info`. Must be called at most once, before the core starts.
pub(crate) fn init_logs() -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_env("LOG_FILTER").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
