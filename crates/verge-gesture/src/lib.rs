//! Edge back-gesture recognition for the verge launcher.
//!
//! The platform feeds raw touch samples into an [`EdgeGestureRecognizer`],
//! which classifies each touch sequence and emits exactly one terminal
//! [`BackGestureResult`] per sequence on a channel. The recognizer drives an
//! [`EdgeGesturePanel`] that holds the derived presentation state of the
//! back-arrow affordance (translation, angle) for a renderer to consume.
//!
//! ```
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use verge_gesture::{
//!     BackGestureResult, EdgeGesturePanel, EdgeGestureRecognizer, NullVibrator, PanelConfig,
//!     RecognizerConfig, Velocity,
//! };
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let panel = EdgeGesturePanel::new(PanelConfig::default(), Box::new(NullVibrator));
//! let mut recognizer = EdgeGestureRecognizer::new(RecognizerConfig::default(), panel, tx);
//!
//! recognizer.on_touch_down(5.0, 500.0);
//! recognizer.on_touch_move(200.0, 500.0, Duration::from_millis(50), Velocity::new(900.0, 0.0));
//! recognizer.on_touch_up();
//!
//! assert_eq!(rx.try_recv(), Ok(BackGestureResult::CompletedFromLeft));
//! ```

pub mod easing;
pub mod panel;
pub mod recognizer;

pub use easing::{CubicBezierEasing, Easing};
pub use panel::{EdgeGesturePanel, NullVibrator, PanelConfig, Vibrator};
pub use recognizer::{EdgeGestureRecognizer, RecognizerConfig};
pub use verge_types::{BackGestureResult, Velocity};
