use tracing_subscriber::EnvFilter;

/// Default filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "resilience=debug,tower_http=debug";

/// Initialize tracing/logging.
///
/// Uses `RUST_LOG` when set. Safe to call more than once; later calls are
/// ignored.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Initialize tracing with JSON output, for log shippers
pub fn init_json_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
