//! Narrow contract with the external emulation runtime
//!
//! The core never talks to the runtime directly. Hosts implement these
//! traits for their environment (a browser page, a test harness):
//! - `ScriptHost`: load the runtime script and expose its entry point
//! - `CommandInterface`: the live handle of a running bundle
//! - `BundleFetcher`: fetch bundle bytes by URL

use crate::types::{NetworkType, RuntimeInfo};

/// File name of the runtime script, appended to the path prefix
pub const RUNTIME_SCRIPT: &str = "emulators.js";

/// Relay port used for IPX peering
pub const IPX_PORT: u16 = 1900;

// ----------------------------------------------------------------------------
// Script Host
// ----------------------------------------------------------------------------

/// Host environment able to load the runtime script
#[async_trait::async_trait]
pub trait ScriptHost: Send + Sync {
    /// Entry point of the runtime if it is already present
    fn runtime_entry(&self) -> Option<RuntimeInfo>;

    /// Inject a script resource and wait for it to load
    async fn inject_script(&self, src: &str) -> Result<(), String>;

    /// Tell the loaded runtime where its sibling assets live
    fn set_path_prefix(&self, path_prefix: &str);
}

/// Script source for a path prefix
pub fn runtime_script_src(path_prefix: &str) -> String {
    format!("{}{}", path_prefix, RUNTIME_SCRIPT)
}

// ----------------------------------------------------------------------------
// Command Interface
// ----------------------------------------------------------------------------

/// Live control handle of a running runtime instance
#[async_trait::async_trait]
pub trait CommandInterface: Send + Sync {
    /// Open a peering link
    async fn network_connect(
        &self,
        network_type: NetworkType,
        address: &str,
        port: u16,
    ) -> Result<(), String>;

    /// Close a peering link; fire-and-forget
    fn network_disconnect(&self, network_type: NetworkType);
}

/// Relay endpoint for an IPX room
///
/// Room names may come from e-mail-like strings, `@` is not allowed in
/// the path segment.
pub fn peering_endpoint(address: &str, room: &str) -> String {
    format!("{}:{}/ipx/{}", address, IPX_PORT, sanitize_room(room))
}

/// Path-safe room name
pub fn sanitize_room(room: &str) -> String {
    room.replace('@', "_")
}

// ----------------------------------------------------------------------------
// Bundle Fetcher
// ----------------------------------------------------------------------------

/// Source of bundle bytes
#[async_trait::async_trait]
pub trait BundleFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_src() {
        assert_eq!(runtime_script_src("/js-dos/"), "/js-dos/emulators.js");
        assert_eq!(runtime_script_src(""), "emulators.js");
    }

    #[test]
    fn test_room_sanitization() {
        assert_eq!(sanitize_room("a@b@c"), "a_b_c");
        assert_eq!(
            peering_endpoint("wss://relay.example", "user@mail.com"),
            "wss://relay.example:1900/ipx/user_mail.com"
        );
    }
}
