//! Core data types shared by the session state machine and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ----------------------------------------------------------------------------
// Session Step
// ----------------------------------------------------------------------------

/// Master lifecycle phase of one emulation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    EmuInit,
    EmuError,
    EmuReady,
    BndLoad,
    BndError,
    BndConfig,
    BndReady,
    BndPlay,
}

impl Step {
    /// All steps in declaration order
    pub const ALL: [Step; 8] = [
        Step::EmuInit,
        Step::EmuError,
        Step::EmuReady,
        Step::BndLoad,
        Step::BndError,
        Step::BndConfig,
        Step::BndReady,
        Step::BndPlay,
    ];

    /// Wire name of the step
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::EmuInit => "emu-init",
            Step::EmuError => "emu-error",
            Step::EmuReady => "emu-ready",
            Step::BndLoad => "bnd-load",
            Step::BndError => "bnd-error",
            Step::BndConfig => "bnd-config",
            Step::BndReady => "bnd-ready",
            Step::BndPlay => "bnd-play",
        }
    }

    /// True for the `*-error` steps
    pub fn is_error(&self) -> bool {
        matches!(self, Step::EmuError | Step::BndError)
    }

    /// Whether a new bundle load may start from this step
    pub fn accepts_bundle_load(&self) -> bool {
        matches!(
            self,
            Step::EmuReady | Step::BndError | Step::BndReady | Step::BndPlay
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Run Options
// ----------------------------------------------------------------------------

/// Parse failure for wire-named enums
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value: {}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            /// Every accepted value
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name as persisted in durable storage
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Emulation engine used by the runtime
    pub enum Backend {
        Dosbox => "dosbox",
        DosboxX => "dosboxX",
    }
}

wire_enum! {
    /// Renderer used for the mount node
    pub enum RenderBackend {
        Webgl => "webgl",
        Canvas => "canvas",
    }
}

wire_enum! {
    /// Aspect ratio applied when rendering
    pub enum RenderAspect {
        Game => "Game",
        Square => "1/1",
        FiveByFour => "5/4",
        FourByThree => "4/3",
        SixteenByTen => "16/10",
        SixteenByNine => "16/9",
        Fit => "Fit",
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Dosbox
    }
}

impl Default for RenderBackend {
    fn default() -> Self {
        RenderBackend::Webgl
    }
}

impl Default for RenderAspect {
    fn default() -> Self {
        RenderAspect::Game
    }
}

// ----------------------------------------------------------------------------
// Bundle Configuration
// ----------------------------------------------------------------------------

/// How a loaded bundle wants to run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<String>,
}

impl BundleConfig {
    /// Backend requested by the bundle, if it names a known one
    pub fn preferred_backend(&self) -> Option<Backend> {
        self.backend.as_deref().and_then(|b| b.parse().ok())
    }

    /// Renderer requested by the bundle, if it names a known one
    pub fn preferred_render(&self) -> Option<RenderBackend> {
        self.render.as_deref().and_then(|r| r.parse().ok())
    }
}

// ----------------------------------------------------------------------------
// Emulator Statistics
// ----------------------------------------------------------------------------

/// One consistent stats sample reported by the runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulatorStats {
    pub cycles_per_ms: f64,
    pub non_skippable_sleep_pre_sec: f64,
    pub sleep_per_sec: f64,
    pub sleep_time_per_sec: f64,
    pub frame_per_sec: f64,
    pub sound_per_sec: f64,
    pub msg_sent_per_sec: f64,
    pub msg_recv_per_sec: f64,
    pub net_sent: f64,
    pub net_recv: f64,
}

// ----------------------------------------------------------------------------
// Peer Networking
// ----------------------------------------------------------------------------

/// IPX peering status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpxStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl IpxStatus {
    /// Whether a link is up or being brought up
    pub fn is_active(&self) -> bool {
        matches!(self, IpxStatus::Connecting | IpxStatus::Connected)
    }
}

/// Network sub-state of the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub ipx: IpxStatus,
}

/// Network type identifiers understood by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NetworkType {
    /// IPX tunnelled over a relay
    DosboxIpx = 0,
}

// ----------------------------------------------------------------------------
// Host Events
// ----------------------------------------------------------------------------

/// Events forwarded to the host callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DosEvent {
    EmuReady,
    CiReady,
    BndPlay,
    OpenKey,
    FullscreenChange,
}

impl DosEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DosEvent::EmuReady => "emu-ready",
            DosEvent::CiReady => "ci-ready",
            DosEvent::BndPlay => "bnd-play",
            DosEvent::OpenKey => "open-key",
            DosEvent::FullscreenChange => "fullscreen-change",
        }
    }
}

impl fmt::Display for DosEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----------------------------------------------------------------------------
// Runtime Handles
// ----------------------------------------------------------------------------

/// Opaque identifier of the host element the runtime renders into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountNode {
    id: String,
}

impl MountNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for MountNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// What the runtime exposes once its script is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub version: String,
    pub path_prefix: Option<String>,
}

/// Decoded bundle payload held by the resource bridge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedBundle {
    pub bundle_url: Option<String>,
    pub bundle_changes_url: Option<String>,
    pub bundle: Option<Vec<u8>>,
    pub bundle_changes: Option<Vec<u8>>,
}

impl LoadedBundle {
    /// Total payload size in bytes
    pub fn size(&self) -> usize {
        self.bundle.as_ref().map_or(0, Vec::len) + self.bundle_changes.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_wire_names() {
        for step in Step::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }

    #[test]
    fn test_render_aspect_parse() {
        assert_eq!("16/9".parse::<RenderAspect>(), Ok(RenderAspect::SixteenByNine));
        assert_eq!("Fit".parse::<RenderAspect>(), Ok(RenderAspect::Fit));
        assert!("AsIs".parse::<RenderAspect>().is_err());
    }

    #[test]
    fn test_backend_wire_names() {
        assert_eq!(Backend::DosboxX.as_str(), "dosboxX");
        assert_eq!(serde_json::to_string(&Backend::DosboxX).unwrap(), "\"dosboxX\"");
        assert_eq!("canvas".parse::<RenderBackend>(), Ok(RenderBackend::Canvas));
    }

    #[test]
    fn test_bundle_config_preferences() {
        let config = BundleConfig {
            backend: Some("dosboxX".to_string()),
            render: Some("opengl".to_string()),
            ..Default::default()
        };
        assert_eq!(config.preferred_backend(), Some(Backend::DosboxX));
        assert_eq!(config.preferred_render(), None);
    }

    #[test]
    fn test_stats_wire_shape() {
        let json = serde_json::to_value(EmulatorStats::default()).unwrap();
        assert!(json.get("cyclesPerMs").is_some());
        assert!(json.get("nonSkippableSleepPreSec").is_some());
        assert!(json.get("netRecv").is_some());
    }
}
