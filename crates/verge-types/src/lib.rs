//! Shared types for verge launcher components.
//!
//! This crate provides the wire-visible types used across verge-overlay and
//! verge-gesture. All protocol types are serializable for transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Window geometry and flags supplied by the hosting window for the overlay
/// attach handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLayout {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Raw window flags, forwarded verbatim to the overlay.
    pub flags: u32,
}

impl WindowLayout {
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            flags: 0,
        }
    }
}

/// Display orientation reported in the attach handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Device configuration forwarded to the overlay so it can lay itself out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub orientation: Orientation,
    pub density_dpi: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            density_dpi: 160,
        }
    }
}

/// Bundle payload for the v3+ attach handshake (`window_attached2`).
///
/// Older protocol versions receive the layout, callback, and options as
/// discrete arguments instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachBundle {
    pub layout: WindowLayout,
    pub configuration: DeviceConfig,
    pub client_options: u32,
    /// Extra layout entries stored by the client via `redraw`, merged in as-is.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
}

/// Activity lifecycle state as a wire-compatible bitmask.
///
/// The remote protocol carries this as a raw integer: bit 0 is STARTED and
/// bit 1 is RESUMED, both independently settable. Named accessors are the
/// only mutation surface; `bits` / `from_bits` preserve the exact wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityState(u32);

impl ActivityState {
    const STARTED: u32 = 1;
    const RESUMED: u32 = 2;

    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & (Self::STARTED | Self::RESUMED))
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn is_started(self) -> bool {
        self.0 & Self::STARTED != 0
    }

    #[must_use]
    pub fn is_resumed(self) -> bool {
        self.0 & Self::RESUMED != 0
    }

    pub fn set_started(&mut self, started: bool) {
        if started {
            self.0 |= Self::STARTED;
        } else {
            self.0 &= !Self::STARTED;
        }
    }

    pub fn set_resumed(&mut self, resumed: bool) {
        if resumed {
            self.0 |= Self::RESUMED;
        } else {
            self.0 &= !Self::RESUMED;
        }
    }
}

/// Terminal classification of one edge-swipe touch sequence.
///
/// Exactly one of these is reported per gesture. The `NotStarted` variants
/// distinguish "swiped, but not from a valid starting point" from "swiped
/// from the edge but released before committing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackGestureResult {
    Unknown,
    CompletedFromLeft,
    CompletedFromRight,
    CancelledFromLeft,
    CancelledFromRight,
    NotStartedTooFarFromEdge,
    NotStartedInNavBarRegion,
}

impl BackGestureResult {
    #[must_use]
    pub fn completed(from_left: bool) -> Self {
        if from_left {
            Self::CompletedFromLeft
        } else {
            Self::CompletedFromRight
        }
    }

    #[must_use]
    pub fn cancelled(from_left: bool) -> Self {
        if from_left {
            Self::CancelledFromLeft
        } else {
            Self::CancelledFromRight
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::CompletedFromLeft | Self::CompletedFromRight)
    }

    #[must_use]
    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::CancelledFromLeft | Self::CancelledFromRight)
    }

    #[must_use]
    pub fn is_not_started(self) -> bool {
        matches!(
            self,
            Self::NotStartedTooFarFromEdge | Self::NotStartedInNavBarRegion
        )
    }
}

/// Instantaneous pointer velocity estimate in px/s, supplied by the
/// platform's velocity tracker.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Magnitude of the velocity vector.
    #[must_use]
    pub fn speed(self) -> f32 {
        self.x.hypot(self.y)
    }
}
