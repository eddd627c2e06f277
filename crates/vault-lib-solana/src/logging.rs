use std::collections::HashMap;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
use vault_lib::config::env::RUST_LOG;

const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG`. Returns `false` when a
/// global subscriber is already set.
pub fn init_tracing(env: &HashMap<String, String>) -> bool {
    let filter = EnvFilter::builder().parse_lossy(
        env.get(RUST_LOG)
            .map(String::as_str)
            .unwrap_or(DEFAULT_FILTER),
    );
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_once() {
        let env = HashMap::from([(RUST_LOG.to_owned(), "debug,vault_lib=trace".to_owned())]);
        init_tracing(&env);
        // a global subscriber is set after the first call
        assert!(!init_tracing(&env));
    }
}
