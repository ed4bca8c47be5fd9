//! js-dos Player Core
//!
//! Serializable building blocks of the player: the session state machine,
//! its data model, configuration, durable option storage and the narrow
//! contract the orchestration layer expects from the emulation runtime.
//!
//! Nothing in this crate holds a live runtime object. Handles such as the
//! command interface are described by traits here and owned by the
//! runtime crate's resource bridge.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod cache;
pub mod config;
pub mod errors;
pub mod host;
pub mod session;
pub mod storage;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use cache::{Cache, CacheNoop, MemoryCache};
pub use config::DosConfig;
pub use errors::{
    BridgeError, BundleError, DosError, DosResult, LoaderError, NetworkError,
    StateTransitionError, StorageError, GENERIC_ERROR_MESSAGE,
};
pub use host::{
    peering_endpoint, runtime_script_src, sanitize_room, BundleFetcher, CommandInterface,
    ScriptHost, IPX_PORT, RUNTIME_SCRIPT,
};
pub use session::{Action, AuditEntry, Effect, PeeringPhase, Session, Transition};
pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage, StorageKey};
pub use types::{
    Backend, BundleConfig, DosEvent, EmulatorStats, IpxStatus, LoadedBundle, MountNode,
    NetworkState, NetworkType, RenderAspect, RenderBackend, RuntimeInfo, Step,
};
