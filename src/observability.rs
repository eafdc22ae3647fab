//! Structured logging configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels, overridable through `RUST_LOG`

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing.
///
/// Logs go to stderr so that event output on stdout stays machine readable.
///
/// # Panics
///
/// Panics if a tracing subscriber has already been initialized in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Span helpers.
pub mod spans {
    use std::path::Path;
    use tracing::{info_span, Span};

    /// Span covering the lifetime of one watch session.
    #[must_use]
    pub fn session_span(fd: i32, watches: usize) -> Span {
        info_span!("session", fd = fd, watches = watches)
    }

    /// Span for registering one path.
    #[must_use]
    pub fn watch_span(path: &Path) -> Span {
        info_span!("watch", path = %path.display())
    }
}
