//! Dev diagnostics via `RUST_LOG`, output to stderr.
//!
//! User-facing progress stays on plain `[switchboard]` stderr lines; tracing
//! carries the debug detail (probe snapshots, resolved configuration, sync
//! decisions) and is silent below `warn` unless `RUST_LOG` says otherwise.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
