//! Error types for the js-dos player core
//!
//! One error enum per concern (runtime loading, bundle loading, peering,
//! resource bridge, step transitions, durable storage) unified by the
//! main `DosError` type.

use crate::types::Step;

/// Message used whenever an error state is entered without a message
pub const GENERIC_ERROR_MESSAGE: &str = "Unexpected error";

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Runtime script loading errors
///
/// `Clone` because a single in-flight load is shared by every caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("Unable to add emulators.js. Probably you should set the 'pathPrefix' option to point to the js-dos folder.")]
    ScriptUnavailable { src: String, reason: String },
    #[error("emulators.js was loaded from {src} but did not expose its entry point")]
    EntryMissing { src: String },
}

/// Bundle fetch/parse errors
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Unable to fetch bundle {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Bundle load for {url} was superseded by a newer request")]
    Superseded { url: String },
}

/// Peering (IPX) errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("DOS is not started")]
    NotStarted,
    #[error("Peering transport failed: {reason}")]
    Transport { reason: String },
    #[error("Peering attempt was cancelled while connecting")]
    Superseded,
}

/// Resource bridge misuse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("Mount node is already bound to {existing}")]
    RootAlreadyBound { existing: String },
    #[error("Resource bridge was torn down")]
    TornDown,
    #[error("Command interface flag {requested} does not match the bridge handle")]
    CommandInterfaceMismatch { requested: bool },
    #[error("Bundle readiness requires a command interface to bind")]
    CommandInterfaceRequired,
}

/// Rejected step transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateTransitionError {
    #[error("Action {action} is not valid in step {from}")]
    InvalidTransition { from: Step, action: &'static str },
}

/// Durable key-value storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for the js-dos player
#[derive(Debug, thiserror::Error)]
pub enum DosError {
    #[error("{0}")]
    Loader(#[from] LoaderError),

    #[error("{0}")]
    Bundle(#[from] BundleError),

    #[error("{0}")]
    Network(#[from] NetworkError),

    #[error("Resource bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StateTransitionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl DosError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        DosError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a bundle fetch error
    pub fn fetch_failed<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        DosError::Bundle(BundleError::Fetch {
            url: url.into(),
            reason: reason.into(),
        })
    }

    /// Create a peering transport error
    pub fn transport_failed<R: Into<String>>(reason: R) -> Self {
        DosError::Network(NetworkError::Transport {
            reason: reason.into(),
        })
    }

    /// Message suitable for the session `error` field
    pub fn user_message(&self) -> String {
        non_empty_message(self.to_string())
    }
}

/// Replace an empty error message with the generic fallback
pub fn non_empty_message(message: impl Into<String>) -> String {
    let message = message.into();
    if message.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, DosError>;
pub type DosResult<T> = Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_message_mentions_path_prefix() {
        let err = LoaderError::ScriptUnavailable {
            src: "dist/emulators.js".to_string(),
            reason: "404".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to add emulators.js. Probably you should set the 'pathPrefix' option to point to the js-dos folder."
        );
        // Surfaced verbatim through the unified error as well
        assert_eq!(DosError::from(err.clone()).user_message(), err.to_string());
    }

    #[test]
    fn test_network_messages() {
        assert_eq!(NetworkError::AlreadyConnected.to_string(), "Already connected");
        assert_eq!(NetworkError::NotStarted.to_string(), "DOS is not started");
    }

    #[test]
    fn test_empty_message_fallback() {
        assert_eq!(non_empty_message(""), GENERIC_ERROR_MESSAGE);
        assert_eq!(non_empty_message("  "), GENERIC_ERROR_MESSAGE);
        assert_eq!(non_empty_message("boom"), "boom");
    }
}
