//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogSettings;
use crate::errors::GenflowError;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Output goes to stderr,
/// either compact text or one JSON object per line.
///
/// # Errors
///
/// Returns [`GenflowError::Config`] if the level is not a valid filter or a
/// global subscriber is already installed.
pub fn init_tracing(settings: &LogSettings) -> Result<(), GenflowError> {
    let filter = build_filter(settings)?;

    let json_layer = settings
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!settings.json).then(|| fmt::layer().with_writer(std::io::stderr).compact());

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| GenflowError::config(format!("Failed to install tracing subscriber: {e}")))
}

fn build_filter(settings: &LogSettings) -> Result<EnvFilter, GenflowError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| GenflowError::config(format!("Invalid log level '{}': {e}", settings.level))),
    }
}
