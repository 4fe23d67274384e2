//! Stderr logging setup.

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter directive: AI_E2E_LOG, then RUST_LOG, then `default`.
pub fn filter_directive(default: &str) -> String {
    ["AI_E2E_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Install the global subscriber once; later calls are no-ops.
///
/// Output goes to stderr so stdout stays clean for JSON/table output.
pub fn init(default_level: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_new(filter_directive(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);
        // Another subscriber may already be installed (tests); keep it.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .try_init();
    });
}
