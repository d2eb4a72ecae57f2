use tracing::{error, info, info_span, warn};

use tracing_tint::init::init_tracing;
use tracing_tint::HandlerOptions;

/// Routes the `tracing` macros through a colorized handler on stderr.
/// Set `NO_COLOR=1` or `TINT_LEVEL=debug` to see the environment overrides.
fn main() {
    let handler = HandlerOptions::from_env()
        .expect("valid TINT_* variables")
        .with_add_source(true)
        .build(std::io::stderr())
        .expect("valid options");
    init_tracing(handler).expect("install subscriber");

    info!(addr = ":8080", env = "production", "Starting server");

    let span = info_span!("req", method = "GET", path = "/users/42");
    let _guard = span.enter();
    warn!(elapsed_ms = 1250_u64, "slow request");

    let err = std::io::Error::other("connection reset");
    error!(err = &err as &(dyn std::error::Error + 'static), "upstream failed");
}
