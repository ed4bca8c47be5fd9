//! js-dos Player Harness
//!
//! Deterministic stand-ins for the external emulation runtime, used by the
//! runtime crate's tests and by hosts exercising the player without a
//! browser.

pub mod command_interface;
pub mod events;
pub mod fetcher;
pub mod script_host;

pub use command_interface::{ConnectCall, MockCommandInterface};
pub use events::EventRecorder;
pub use fetcher::MockBundleFetcher;
pub use script_host::MockScriptHost;

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber; repeated calls are no-ops
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
