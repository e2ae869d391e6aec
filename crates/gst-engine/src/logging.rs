//! # Logging Bootstrap
//!
//! Installs the global `tracing` subscriber.
//!
//! ```text
//! RUST_LOG set?  ── yes ──► use RUST_LOG
//!      │
//!      no
//!      ▼
//! config [logging].filter (default "info")
//! ```

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG` or `default_filter`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Err only means a subscriber is already installed (tests, embedding apps)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
