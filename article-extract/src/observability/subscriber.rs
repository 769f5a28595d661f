//! Global `tracing` subscriber setup for binaries and examples embedding the reader.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::ExtractError;

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns an error instead of panicking when a global subscriber is already set.
pub fn init_tracing(default_filter: &str, json: bool) -> Result<(), ExtractError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_filter)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.map_err(|e| ExtractError::Config(format!("tracing subscriber: {e}")))
}

fn parse_filter(directives: &str) -> Result<EnvFilter, ExtractError> {
    EnvFilter::try_new(directives).map_err(|e| ExtractError::Config(format!("log filter '{directives}': {e}")))
}
