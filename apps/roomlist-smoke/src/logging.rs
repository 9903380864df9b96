//! Tracing bootstrap for the smoke app.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,roomlist_smoke=debug,roomlist_provider=debug";

/// Filter variables consulted after `RUST_LOG`, most specific first.
const FILTER_VARS: [&str; 2] = ["ROOMLIST_SMOKE_LOG", "ROOMLIST_LOG"];

/// Install the global subscriber.
///
/// Precedence: `RUST_LOG`, then `ROOMLIST_SMOKE_LOG`, then `ROOMLIST_LOG`,
/// then the built-in default. Unparseable values fall through.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_env_filter(filter_from_env())
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    FILTER_VARS
        .iter()
        .filter_map(|key| env::var(key).ok())
        .filter(|value| !value.trim().is_empty())
        .find_map(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
