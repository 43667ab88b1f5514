//! Presentation state for the back-gesture arrow affordance.
//!
//! The panel owns no business decision beyond the directional heuristics
//! that happen to live in it: the sustained-direction override, the
//! velocity-derived angle offset, and the vertical override. Everything it
//! exposes is derived state (translation, angle) for a renderer to consume.

use tracing::trace;
use verge_types::Velocity;

use crate::easing::{CubicBezierEasing, Easing};

/// The basic translation in dp where the arrow rests.
const BASE_TRANSLATION_DP: f32 = 32.0;

/// Length of one arrow leg measured from the center to the end, in dp.
const ARROW_LENGTH_DP: f32 = 18.0;

/// Angle from the x axis of the arrow leg when the arrow is extended.
const ARROW_ANGLE_WHEN_EXTENDED_DEGREES: f32 = 56.0;

/// Angle added to the leg per 1000 px/s of pointer speed.
const ARROW_ANGLE_ADDED_PER_1000_SPEED: f32 = 4.0;

/// Maximum angle offset allowed due to speed.
const ARROW_MAX_ANGLE_SPEED_OFFSET_DEGREES: f32 = 4.0;

/// Rubber banding applied beyond the base translation and to the vertical
/// translation. Resistance rises faster out there than during appearance.
const RUBBER_BAND_AMOUNT: f32 = 15.0;

/// Rubber banding applied to the translation before base translation.
const RUBBER_BAND_AMOUNT_APPEAR: f32 = 4.0;

/// Minimum cumulative delta needed for the arrow to change direction and
/// start or stop triggering back.
const MIN_DELTA_FOR_SWITCH_DP: f32 = 32.0;

/// Haptics seam; the platform supplies the real effect player.
pub trait Vibrator: Send {
    fn click(&mut self);
}

/// Vibrator for hosts without a haptics service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVibrator;

impl Vibrator for NullVibrator {
    fn click(&mut self) {}
}

/// Externally supplied panel geometry. All lengths in px.
#[derive(Debug, Clone, Copy)]
pub struct PanelConfig {
    /// Display density (px per dp).
    pub density: f32,
    /// Horizontal drag distance after which the gesture commits to back by
    /// default and the one haptic per gesture fires.
    pub swipe_threshold: f32,
    /// min(display width, display height); normalizes the drag range.
    pub screen_size: f32,
    /// Furthest the arrow may translate from its edge.
    pub max_translation: f32,
    /// Height of the panel view, bounds the vertical translation.
    pub panel_height: f32,
    /// True in left-to-right layouts; both panels' arrows point the same way.
    pub arrows_point_left: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            swipe_threshold: 16.0,
            screen_size: 1080.0,
            max_translation: 56.0,
            panel_height: 256.0,
            arrows_point_left: true,
        }
    }
}

/// Derived presentation state of the back arrow for one gesture.
pub struct EdgeGesturePanel {
    config: PanelConfig,
    easing: Box<dyn Easing>,
    appear_easing: Box<dyn Easing>,
    vibrator: Box<dyn Vibrator>,

    base_translation: f32,
    arrow_length: f32,
    min_delta_for_switch: f32,

    is_left_panel: bool,
    start_x: f32,
    start_y: f32,
    trigger_back: bool,
    drag_slop_passed: bool,
    previous_touch_translation: f32,
    total_touch_delta: f32,
    angle_offset: f32,
    desired_translation: f32,
    vertical_translation: f32,
    desired_angle: f32,
}

impl EdgeGesturePanel {
    #[must_use]
    pub fn new(config: PanelConfig, vibrator: Box<dyn Vibrator>) -> Self {
        Self::with_easing(
            config,
            vibrator,
            Box::new(CubicBezierEasing::rubber_band()),
            Box::new(CubicBezierEasing::rubber_band_appear()),
        )
    }

    /// Construct with custom rubber-band curves. Both must be monotonic maps
    /// of `[0, 1]` onto `[0, 1]`.
    #[must_use]
    pub fn with_easing(
        config: PanelConfig,
        vibrator: Box<dyn Vibrator>,
        easing: Box<dyn Easing>,
        appear_easing: Box<dyn Easing>,
    ) -> Self {
        let density = config.density;
        Self {
            config,
            easing,
            appear_easing,
            vibrator,
            base_translation: BASE_TRANSLATION_DP * density,
            arrow_length: ARROW_LENGTH_DP * density,
            min_delta_for_switch: MIN_DELTA_FOR_SWITCH_DP * density,
            is_left_panel: true,
            start_x: 0.0,
            start_y: 0.0,
            trigger_back: false,
            drag_slop_passed: false,
            previous_touch_translation: 0.0,
            total_touch_delta: 0.0,
            angle_offset: 0.0,
            desired_translation: 0.0,
            vertical_translation: 0.0,
            desired_angle: 90.0,
        }
    }

    pub fn set_is_left_panel(&mut self, is_left_panel: bool) {
        self.is_left_panel = is_left_panel;
    }

    #[must_use]
    pub fn is_left_panel(&self) -> bool {
        self.is_left_panel
    }

    /// Would the gesture currently commit as back.
    #[must_use]
    pub fn trigger_back(&self) -> bool {
        self.trigger_back
    }

    /// Rubber-banded horizontal translation of the arrow.
    #[must_use]
    pub fn translation(&self) -> f32 {
        self.desired_translation
    }

    /// Rubber-banded vertical translation following the finger.
    #[must_use]
    pub fn vertical_translation(&self) -> f32 {
        self.vertical_translation
    }

    /// Current leg angle: 90 at rest, extended angle plus the velocity
    /// offset while triggering.
    #[must_use]
    pub fn angle(&self) -> f32 {
        self.desired_angle
    }

    /// Reset all per-gesture state at touch-down.
    pub fn on_down(&mut self, x: f32, y: f32) {
        self.start_x = x;
        self.start_y = y;
        self.trigger_back = false;
        self.drag_slop_passed = false;
        self.previous_touch_translation = 0.0;
        self.total_touch_delta = 0.0;
        self.angle_offset = 0.0;
        self.desired_translation = 0.0;
        self.vertical_translation = 0.0;
        self.desired_angle = 90.0;
    }

    /// Feed one touch-move sample.
    pub fn on_move(&mut self, x: f32, y: f32, velocity: Velocity) {
        let touch_translation = (x - self.start_x).abs();
        let y_offset = y - self.start_y;

        let delta = touch_translation - self.previous_touch_translation;
        if delta != 0.0 {
            if delta.signum() == self.total_touch_delta.signum() {
                self.total_touch_delta += delta;
            } else {
                // Sign flip: the sustained-direction sum restarts from this
                // single step.
                self.total_touch_delta = delta;
            }
        }
        self.previous_touch_translation = touch_translation;

        if !self.drag_slop_passed && touch_translation > self.config.swipe_threshold {
            self.drag_slop_passed = true;
            self.vibrator.click();
            // Once moving, default to triggering back.
            self.trigger_back = true;
        }

        let mut translation = self.rubber_band(touch_translation);

        let mut trigger_back = self.trigger_back;
        if self.total_touch_delta.abs() > self.min_delta_for_switch {
            trigger_back = self.total_touch_delta > 0.0;
        }

        self.angle_offset = (velocity.speed() / 1000.0 * ARROW_ANGLE_ADDED_PER_1000_SPEED)
            .min(ARROW_MAX_ANGLE_SPEED_OFFSET_DEGREES)
            * velocity.x.signum();
        if self.is_left_panel == self.config.arrows_point_left {
            self.angle_offset *= -1.0;
        }

        // A mostly-vertical swipe can never be back.
        if y_offset.abs() > (x - self.start_x).abs() * 2.0 {
            trigger_back = false;
        }
        self.trigger_back = trigger_back;

        if self.trigger_back {
            if self.is_left_panel == self.config.arrows_point_left {
                // The arrow faces away from the travel direction on this
                // side; move it less.
                translation -= self.static_arrow_width();
            }
        } else {
            translation = 0.0;
        }
        self.desired_translation = translation;
        self.desired_angle = if self.trigger_back {
            ARROW_ANGLE_WHEN_EXTENDED_DEGREES + self.angle_offset
        } else {
            90.0
        };

        let max_y_offset = self.config.panel_height / 2.0 - self.arrow_length;
        let progress = (y_offset.abs() / (max_y_offset * RUBBER_BAND_AMOUNT)).clamp(0.0, 1.0);
        self.vertical_translation = self.easing.ease(progress) * max_y_offset * y_offset.signum();

        trace!(
            trigger = self.trigger_back,
            translation = self.desired_translation,
            angle = self.desired_angle,
            "panel sample"
        );
    }

    fn rubber_band(&self, touch_translation: f32) -> f32 {
        if touch_translation > self.base_translation {
            let diff = touch_translation - self.base_translation;
            let progress = (diff / (self.config.screen_size - self.base_translation)).clamp(0.0, 1.0);
            self.base_translation
                + self.easing.ease(progress) * (self.config.max_translation - self.base_translation)
        } else {
            let diff = self.base_translation - touch_translation;
            let progress = (diff / self.base_translation).clamp(0.0, 1.0);
            self.base_translation
                - self.appear_easing.ease(progress) * (self.base_translation / RUBBER_BAND_AMOUNT_APPEAR)
        }
    }

    fn static_arrow_width(&self) -> f32 {
        ARROW_ANGLE_WHEN_EXTENDED_DEGREES.to_radians().cos() * self.arrow_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingVibrator(Arc<AtomicUsize>);

    impl Vibrator for CountingVibrator {
        fn click(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn panel() -> (EdgeGesturePanel, CountingVibrator) {
        let vibrator = CountingVibrator::default();
        let panel = EdgeGesturePanel::new(PanelConfig::default(), Box::new(vibrator.clone()));
        (panel, vibrator)
    }

    #[test]
    fn test_forward_drag_triggers_back() {
        let (mut panel, _) = panel();
        panel.set_is_left_panel(true);
        panel.on_down(5.0, 500.0);
        panel.on_move(200.0, 500.0, Velocity::new(800.0, 0.0));
        assert!(panel.trigger_back());
        assert!((panel.angle() - 90.0).abs() > f32::EPSILON, "arrow extended");
    }

    #[test]
    fn test_haptic_fires_exactly_once_per_gesture() {
        let (mut panel, vibrator) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(30.0, 500.0, Velocity::default());
        panel.on_move(60.0, 500.0, Velocity::default());
        panel.on_move(90.0, 500.0, Velocity::default());
        assert_eq!(vibrator.0.load(Ordering::SeqCst), 1);

        // Next gesture gets its own click.
        panel.on_down(5.0, 500.0);
        panel.on_move(90.0, 500.0, Velocity::default());
        assert_eq!(vibrator.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sustained_reverse_motion_switches_direction() {
        let (mut panel, _) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(150.0, 500.0, Velocity::default());
        assert!(panel.trigger_back());

        // Jitter below the switch threshold keeps the direction.
        panel.on_move(140.0, 500.0, Velocity::default());
        assert!(panel.trigger_back());

        // Sustained motion back toward the origin flips it.
        panel.on_move(100.0, 500.0, Velocity::default());
        assert!(!panel.trigger_back());
    }

    #[test]
    fn test_cumulative_delta_resets_on_sign_flip() {
        let (mut panel, _) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(150.0, 500.0, Velocity::default());
        // 20px back is a fresh sum, not 150 - 20.
        panel.on_move(130.0, 500.0, Velocity::default());
        assert!(panel.trigger_back(), "single small reversal must not switch");
        // Another 20px back accumulates past the 32px switch threshold.
        panel.on_move(110.0, 500.0, Velocity::default());
        assert!(!panel.trigger_back());
    }

    #[test]
    fn test_vertical_override_wins() {
        let (mut panel, _) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(100.0, 800.0, Velocity::default());
        assert!(!panel.trigger_back(), "dy 300 > 2 * dx 95");
        assert_eq!(panel.translation(), 0.0);
        assert_eq!(panel.angle(), 90.0);
    }

    #[test]
    fn test_angle_offset_capped_at_four_degrees() {
        let (mut panel, _) = panel();
        // Right panel in LTR: no sign flip.
        panel.set_is_left_panel(false);
        panel.on_down(1075.0, 500.0);
        panel.on_move(900.0, 500.0, Velocity::new(-5000.0, 0.0));
        assert!(panel.trigger_back());
        let offset = panel.angle() - ARROW_ANGLE_WHEN_EXTENDED_DEGREES;
        assert!((offset + 4.0).abs() < 0.001, "capped at 4 degrees, got {offset}");
    }

    #[test]
    fn test_angle_offset_sign_flips_on_left_panel() {
        let config = PanelConfig::default();
        let (mut panel, _) = panel();
        assert!(config.arrows_point_left);
        panel.set_is_left_panel(true);
        panel.on_down(5.0, 500.0);
        panel.on_move(120.0, 500.0, Velocity::new(2000.0, 0.0));
        let offset = panel.angle() - ARROW_ANGLE_WHEN_EXTENDED_DEGREES;
        assert!(offset < 0.0, "left panel flips the velocity offset");
    }

    #[test]
    fn test_translation_rubber_bands_below_max() {
        let (mut panel, _) = panel();
        // Right panel avoids the static-arrow-width correction.
        panel.set_is_left_panel(false);
        panel.on_down(1075.0, 500.0);
        let mut previous = 0.0;
        for step in 1..=10 {
            #[allow(clippy::cast_precision_loss)] // step <= 10
            let x = 1075.0 - 100.0 * step as f32;
            panel.on_move(x.max(0.0), 500.0, Velocity::default());
            let translation = panel.translation();
            assert!(translation >= previous, "translation must grow monotonically");
            assert!(translation <= PanelConfig::default().max_translation);
            previous = translation;
        }
    }

    #[test]
    fn test_vertical_translation_follows_finger_sign() {
        let (mut panel, _) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(100.0, 520.0, Velocity::default());
        assert!(panel.vertical_translation() > 0.0);
        panel.on_move(100.0, 400.0, Velocity::default());
        assert!(panel.vertical_translation() < 0.0);
    }

    #[test]
    fn test_on_down_resets_state() {
        let (mut panel, _) = panel();
        panel.on_down(5.0, 500.0);
        panel.on_move(200.0, 520.0, Velocity::new(1000.0, 0.0));
        assert!(panel.trigger_back());

        panel.on_down(5.0, 500.0);
        assert!(!panel.trigger_back());
        assert_eq!(panel.translation(), 0.0);
        assert_eq!(panel.vertical_translation(), 0.0);
        assert_eq!(panel.angle(), 90.0);
    }
}
