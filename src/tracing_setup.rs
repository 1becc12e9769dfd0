//! Console tracing setup
//!
//! Library code only emits events; installing a subscriber is the host's
//! choice. Binaries and integration tests that want console output call
//! [`init_tracing`] once.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a console subscriber filtered by `RUST_LOG` (default: `info`)
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
