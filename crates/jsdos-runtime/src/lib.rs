//! js-dos Player Runtime
//!
//! Orchestration layer of the player, including:
//! - `ResourceBridge`: owner of the live runtime handles
//! - `Store`: serialized dispatch of session transitions and their effects
//! - `RuntimeLoader`, `NetworkConnector` and `EventGateway` collaborators
//! - `SessionController`: the per-session owner of all of the above
//!
//! `jsdos-core` provides the state machine and data model this crate drives.

pub mod bridge;
pub mod connector;
pub mod gateway;
pub mod loader;
pub mod store;

mod builder;
mod controller;

pub use bridge::{EventCallback, HostOptions, ResourceBridge};
pub use builder::SessionBuilder;
pub use connector::NetworkConnector;
pub use controller::SessionController;
pub use gateway::EventGateway;
pub use loader::RuntimeLoader;
pub use store::Store;

// Re-export core types for convenience
pub use jsdos_core::{
    Action, Backend, BundleConfig, BundleFetcher, CommandInterface, DosConfig, DosError,
    DosEvent, DosResult, EmulatorStats, IpxStatus, KeyValueStorage, MountNode, NetworkType,
    RenderAspect, RenderBackend, ScriptHost, Session, Step,
};
