#![forbid(unsafe_code)]

//! Logging helpers.
//!
//! With the `tracing` feature the usual `tracing` macros are re-exported at
//! the crate root. The `tracing-json` feature adds [`init_json_logging`], a
//! one-call JSON subscriber for production hosts.

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Install a global JSON subscriber filtered by `RUST_LOG`
/// (default `blockline=info`).
///
/// Returns `false` when a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blockline=info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
