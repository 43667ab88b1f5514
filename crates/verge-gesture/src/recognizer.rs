//! Edge back-gesture touch classifier.
//!
//! Consumes one continuous touch sequence (down, moves, up/cancel) and emits
//! exactly one terminal [`BackGestureResult`] for it, driving the companion
//! [`EdgeGesturePanel`] with every sample along the way. Strictly
//! single-touch; a second pointer cancels the gesture in progress.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use verge_types::{BackGestureResult, Velocity};

use crate::panel::EdgeGesturePanel;

/// Externally supplied platform values; nothing here is computed by the
/// recognizer. All lengths in px.
#[derive(Debug, Clone, Copy)]
pub struct RecognizerConfig {
    pub display_width: f32,
    pub display_height: f32,
    /// Width of the edge band a back gesture may start in, per side.
    pub edge_width: f32,
    pub left_inset: f32,
    pub right_inset: f32,
    /// Height of the excluded bottom gesture-bar region.
    pub bottom_gesture_height: f32,
    /// Minimum horizontal displacement for an intentional drag.
    pub touch_slop: f32,
    /// A touch that stays under the slop for this long is a potential
    /// long-press, not a swipe.
    pub long_press_timeout: Duration,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            display_width: 1080.0,
            display_height: 2400.0,
            edge_width: 30.0,
            left_inset: 0.0,
            right_inset: 0.0,
            bottom_gesture_height: 80.0,
            touch_slop: 8.0,
            long_press_timeout: Duration::from_millis(400),
        }
    }
}

/// Why a touch-down was outside the allowed edge band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    TooFarFromEdge,
    NavBarRegion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Sampling { rejection: Option<Rejection> },
}

/// Touch-stream classifier for the edge back gesture.
pub struct EdgeGestureRecognizer {
    config: RecognizerConfig,
    panel: EdgeGesturePanel,
    results: mpsc::UnboundedSender<BackGestureResult>,
    state: State,
    down_x: f32,
    down_y: f32,
    last_x: f32,
    threshold_crossed: bool,
}

impl EdgeGestureRecognizer {
    #[must_use]
    pub fn new(
        config: RecognizerConfig,
        panel: EdgeGesturePanel,
        results: mpsc::UnboundedSender<BackGestureResult>,
    ) -> Self {
        Self {
            config,
            panel,
            results,
            state: State::Idle,
            down_x: 0.0,
            down_y: 0.0,
            last_x: 0.0,
            threshold_crossed: false,
        }
    }

    /// Derived presentation state for the renderer.
    #[must_use]
    pub fn panel(&self) -> &EdgeGesturePanel {
        &self.panel
    }

    /// Sticky once the horizontal displacement exceeded the slop within the
    /// current gesture.
    #[must_use]
    pub fn threshold_crossed(&self) -> bool {
        self.threshold_crossed
    }

    /// Begin a touch sequence.
    ///
    /// A down outside the edge band (or inside the bottom gesture bar) marks
    /// the sequence rejected up front; motion is still forwarded so the panel
    /// can show a cancel affordance if it had partially started.
    pub fn on_touch_down(&mut self, x: f32, y: f32) {
        if self.state != State::Idle {
            // Not a defined input; close out the old gesture instead of
            // crashing or leaking it.
            warn!("touch down while a gesture is in progress");
            self.finish(true);
        }
        let rejection = self.classify_down(x, y);
        self.state = State::Sampling { rejection };
        self.down_x = x;
        self.down_y = y;
        self.last_x = x;
        self.threshold_crossed = false;

        // Rejected downs still pick a side so the result names the closer edge.
        let is_left = if rejection.is_some() {
            x < self.config.display_width / 2.0
        } else {
            x <= self.left_edge_limit()
        };
        self.panel.set_is_left_panel(is_left);
        self.panel.on_down(x, y);
        debug!(x, y, ?rejection, "gesture down");
    }

    /// Feed a touch-move sample. `elapsed` is the time since touch-down and
    /// `velocity` the platform's instantaneous estimate.
    pub fn on_touch_move(&mut self, x: f32, y: f32, elapsed: Duration, velocity: Velocity) {
        let State::Sampling { rejection } = self.state else {
            return;
        };
        self.last_x = x;

        if rejection.is_none() && !self.threshold_crossed {
            if (x - self.down_x).abs() > self.config.touch_slop {
                self.threshold_crossed = true;
            } else if elapsed > self.config.long_press_timeout {
                // Evaluated opportunistically on the next sample only; a
                // touch with no further moves is classified at release.
                debug!("long-press timeout before slop, cancelling");
                self.emit(BackGestureResult::cancelled(self.panel.is_left_panel()));
                self.state = State::Idle;
                return;
            }
        }

        self.panel.on_move(x, y, velocity);
    }

    /// Finalize on touch-up.
    pub fn on_touch_up(&mut self) {
        self.finish(false);
    }

    /// Finalize on a platform cancel.
    pub fn on_touch_cancel(&mut self) {
        self.finish(true);
    }

    /// Back gesture recognition is strictly single-touch: a second pointer
    /// going down cancels the gesture in progress.
    pub fn on_pointer_down(&mut self) {
        if self.state != State::Idle {
            debug!("second pointer down, cancelling gesture");
            self.finish(true);
        }
    }

    fn finish(&mut self, forced_cancel: bool) {
        let State::Sampling { rejection } = self.state else {
            return;
        };
        self.state = State::Idle;

        match rejection {
            None => {
                let from_left = self.panel.is_left_panel();
                let result = if !forced_cancel && self.panel.trigger_back() {
                    BackGestureResult::completed(from_left)
                } else {
                    BackGestureResult::cancelled(from_left)
                };
                self.emit(result);
            }
            Some(rejection) => {
                // Only report a rejected attempt when the user actually
                // swiped; an idle tap outside the band is not a gesture.
                if (self.last_x - self.down_x).abs() > self.config.touch_slop {
                    self.emit(match rejection {
                        Rejection::TooFarFromEdge => BackGestureResult::NotStartedTooFarFromEdge,
                        Rejection::NavBarRegion => BackGestureResult::NotStartedInNavBarRegion,
                    });
                }
            }
        }
    }

    fn emit(&mut self, result: BackGestureResult) {
        debug!(?result, "gesture result");
        // The host dropping its receiver only loses the notification.
        let _ = self.results.send(result);
    }

    fn classify_down(&self, x: f32, y: f32) -> Option<Rejection> {
        if y >= self.config.display_height - self.config.bottom_gesture_height {
            return Some(Rejection::NavBarRegion);
        }
        let near_left = x <= self.left_edge_limit();
        let near_right =
            x >= self.config.display_width - self.config.edge_width - self.config.right_inset;
        if near_left || near_right {
            None
        } else {
            Some(Rejection::TooFarFromEdge)
        }
    }

    fn left_edge_limit(&self) -> f32 {
        self.config.edge_width + self.config.left_inset
    }
}
