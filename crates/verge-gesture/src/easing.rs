//! Easing curves for rubber-banded drag resistance.
//!
//! The arrow affordance compresses its visual displacement smoothly as the
//! finger travels past the natural rest position, asymptotically approaching
//! a cap instead of clamping. The curve itself is pluggable; consumers only
//! rely on it being a monotonic map of `[0, 1]` onto `[0, 1]`.

/// A monotonic easing function mapping `[0, 1]` to `[0, 1]` with
/// `ease(0) == 0` and `ease(1) == 1`.
pub trait Easing: Send {
    fn ease(&self, fraction: f32) -> f32;
}

/// Cubic bezier easing with fixed endpoints at (0, 0) and (1, 1).
#[derive(Debug, Clone, Copy)]
pub struct CubicBezierEasing {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl CubicBezierEasing {
    /// Control x coordinates must lie in `[0, 1]` so the curve stays a
    /// function of the input fraction.
    #[must_use]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    /// Resistance curve applied once the drag exceeds the base travel
    /// distance: steep initial response flattening out hard.
    #[must_use]
    pub fn rubber_band() -> Self {
        Self::new(1.0 / 5.0, 1.0, 1.0, 1.0)
    }

    /// Gentler resistance curve for the regime before base travel, while the
    /// arrow is still appearing.
    #[must_use]
    pub fn rubber_band_appear() -> Self {
        Self::new(1.0 / 4.0, 1.0, 1.0, 1.0)
    }

    fn sample(p1: f32, p2: f32, t: f32) -> f32 {
        let u = 1.0 - t;
        3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
    }
}

impl Easing for CubicBezierEasing {
    fn ease(&self, fraction: f32) -> f32 {
        let x = fraction.clamp(0.0, 1.0);
        if x == 0.0 || x == 1.0 {
            return x;
        }
        // Invert x(t) by bisection; x(t) is monotonic for control xs in [0,1].
        let mut lo = 0.0f32;
        let mut hi = 1.0f32;
        for _ in 0..32 {
            let mid = (lo + hi) / 2.0;
            if Self::sample(self.x1, self.x2, mid) < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let t = (lo + hi) / 2.0;
        Self::sample(self.y1, self.y2, t).clamp(0.0, 1.0)
    }
}
