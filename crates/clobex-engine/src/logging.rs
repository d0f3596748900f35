//! Tracing subscriber setup for hosts embedding the exchange.
//!
//! Honors `RUST_LOG` and `LOG_FORMAT=json|text`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose spans and events `verbose` turns up to debug.
const CRATES: &[&str] = &["clobex_engine", "clobex_book", "clobex_ledger"];

/// Install a global subscriber. Returns `false` if one was already set,
/// so calling it twice (e.g. from several tests) is harmless.
pub fn init_logging(verbose: bool) -> bool {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|name| format!("{name}={level}")).collect();
        EnvFilter::new(format!("{},warn", directives.join(",")))
    });

    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let result = if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(filter)
            .try_init()
    };
    result.is_ok()
}
