//! Protocol version discovery and the capability table derived from it.
//!
//! The overlay protocol is capability-negotiated, not request/response
//! negotiated: the client assumes the server's capabilities from static
//! package metadata resolved before connecting. Every call-shape difference
//! between protocol generations is answered by the [`Capabilities`] table,
//! resolved exactly once per connection, instead of `version >= N` checks
//! scattered across call sites.

use tracing::debug;

/// Metadata key under which the overlay package advertises its API version.
pub const SERVICE_API_VERSION_KEY: &str = "service.api.version";

/// Source of the installed overlay package's service metadata.
///
/// Abstracts the platform package lookup. Returns `None` when the overlay
/// package is not installed or carries no version metadata.
pub trait VersionSource: Send {
    fn service_api_version(&self) -> Option<i32>;
}

/// A fixed version source, useful for composition roots that already know
/// the provider version and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedVersion(pub i32);

impl VersionSource for FixedVersion {
    fn service_api_version(&self) -> Option<i32> {
        Some(self.0)
    }
}

/// Resolved overlay protocol version.
///
/// Anything unresolved (missing package, missing metadata, non-positive
/// value) collapses to version 1, the most conservative handshake shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion(i32);

impl ProtocolVersion {
    pub const MIN: Self = Self(1);

    #[must_use]
    pub fn resolve(source: &dyn VersionSource) -> Self {
        let version = match source.service_api_version() {
            Some(v) if v > 0 => Self(v),
            _ => Self::MIN,
        };
        debug!("resolved overlay protocol version {version}");
        version
    }

    #[must_use]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability table keyed by resolved protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Attach handshake uses the bundle form (`window_attached2`).
    pub bundle_attach: bool,
    /// Lifecycle state is forwarded as a single bitmask call instead of
    /// discrete resume/pause calls.
    pub unified_activity_state: bool,
    /// `start_search` is supported by the remote.
    pub search: bool,
    /// A stored layout-extras change may re-trigger the handshake without
    /// waiting for the next natural reattachment.
    pub incremental_redraw: bool,
}

impl Capabilities {
    #[must_use]
    pub fn from_version(version: ProtocolVersion) -> Self {
        let v = version.get();
        Self {
            bundle_attach: v >= 3,
            unified_activity_state: v >= 4,
            search: v >= 6,
            incremental_redraw: v >= 7,
        }
    }
}
