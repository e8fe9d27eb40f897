//! HTTP backend and terminal check-in flow for the attendance system.

pub mod app;
pub mod checkin;
pub mod error;
pub mod middleware;
mod test_utils;

pub use app::{AppState, router};
pub use error::{ServerError, ServerResult};
pub use middleware::InstrumentedApi;

/// Environment variable consulted first for the log filter.
pub const LOG_LEVEL_ENV: &str = "ATTENDANCE_LOG_LEVEL";

/// Pick the log filter: `ATTENDANCE_LOG_LEVEL`, then `RUST_LOG`, then `info`.
pub fn log_directive_from<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut non_blank = |key: &str| get(key).filter(|s| !s.trim().is_empty());
    non_blank(LOG_LEVEL_ENV)
        .or_else(|| non_blank("RUST_LOG"))
        .unwrap_or_else(|| "info".to_string())
}

pub fn log_directive() -> String {
    log_directive_from(|key| std::env::var(key).ok())
}

/// Build the env filter, keeping noisy HTTP internals at `warn` unless
/// the directive names them. Falls back to `info` on a malformed directive.
pub fn env_filter(directive: &str) -> tracing_subscriber::EnvFilter {
    let combined = format!("{directive},hyper=warn,reqwest=warn");
    tracing_subscriber::EnvFilter::try_new(combined)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hyper=warn,reqwest=warn"))
}

/// Install the compact stderr subscriber used by both binaries.
pub fn init_tracing() -> String {
    let directive = log_directive();
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter(&directive))
        .init();
    directive
}
