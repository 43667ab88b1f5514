//! Overlay client connection protocol for the verge launcher.
//!
//! This crate maintains a deduplicated, versioned binding to an externally
//! installed overlay service (a search/feed surface embedded behind the
//! launcher) and propagates window-lifecycle transitions and scroll/search
//! intents across it, tolerating the service being absent, crashing, or
//! being reinstalled.
//!
//! # Architecture
//!
//! - [`capability`]: protocol version discovery and the capability table
//! - [`proxy`]: the remote RPC surface and the callback return channel
//! - [`connection`]: the shared connection (one binding, many clients)
//! - [`client`]: the per-window client driving lifecycle and scroll calls
//! - [`error`]: result/error types for remote calls
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use verge_overlay::{FixedVersion, OverlayConnection, OverlayClient, ScrollCallback, ServiceBinder};
//! use verge_types::DeviceConfig;
//!
//! struct NoBinder;
//! impl ServiceBinder for NoBinder {
//!     fn bind(&mut self) -> bool { false }
//!     fn unbind(&mut self) {}
//! }
//!
//! struct Sink;
//! impl ScrollCallback for Sink {
//!     fn on_overlay_scroll_changed(&mut self, _progress: f32) {}
//!     fn on_service_state_changed(&mut self, _usable: bool) {}
//! }
//!
//! let connection = Arc::new(OverlayConnection::new(
//!     Box::new(NoBinder),
//!     Box::new(FixedVersion(7)),
//! ));
//! let mut client = OverlayClient::new(
//!     connection,
//!     Box::new(Sink),
//!     Box::new(NoBinder),
//!     0,
//!     DeviceConfig::default(),
//! );
//! client.pump();
//! assert!(!client.is_connected());
//! ```

pub mod capability;
pub mod client;
pub mod connection;
pub mod error;
pub mod proxy;

pub use capability::{Capabilities, FixedVersion, ProtocolVersion, SERVICE_API_VERSION_KEY, VersionSource};
pub use client::{OverlayClient, ScrollCallback};
pub use connection::{ClientId, ConnectionEvent, OverlayConnection, ServiceBinder};
pub use error::{OverlayError, Result};
pub use proxy::{OverlayCallback, OverlayEvent, OverlayService, SharedOverlay};

pub use verge_types::{ActivityState, AttachBundle, DeviceConfig, Orientation, WindowLayout};
