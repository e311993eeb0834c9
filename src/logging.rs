//! Tracing subscriber setup for applications embedding the store.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the application. Filters are passed explicitly since the store
//! reads no environment variables.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a stdout subscriber at `info` level.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    init_with("info")
}

/// Installs a stdout subscriber with the given filter directive
/// (e.g. `"kvstash=debug"`). Invalid directives fall back to `info`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_with(directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(directive))
        .with(fmt::layer())
        .try_init()
        .is_ok()
}

/// Installs a JSON-formatted subscriber with the given filter directive.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_json(directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(directive))
        .with(fmt::layer().json())
        .try_init()
        .is_ok()
}

fn filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"))
}
