//! Interpolation and easing.
//!
//! Keyframes and controller transitions share one [`Easing`] vocabulary.
//! Named curves map onto cubic-bezier timing the same way CSS defines them.

pub mod functions;

use serde::{Deserialize, Serialize};

use functions::bezier_ease_t;

/// Timing curve applied to a normalized progress value in [0,1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    /// Holds the start value until progress reaches 1.
    Step,
    /// Custom cubic-bezier timing with control points (x1, y1, x2, y2).
    Bezier([f32; 4]),
}

impl Easing {
    const EASE_IN: [f32; 4] = [0.42, 0.0, 1.0, 1.0];
    const EASE_OUT: [f32; 4] = [0.0, 0.0, 0.58, 1.0];
    const EASE_IN_OUT: [f32; 4] = [0.42, 0.0, 0.58, 1.0];

    /// Map linear progress `t` to eased progress. Input is clamped to [0,1].
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::Step => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Easing::EaseIn => bezier_ease_t(t, Self::EASE_IN),
            Easing::EaseOut => bezier_ease_t(t, Self::EASE_OUT),
            Easing::EaseInOut => bezier_ease_t(t, Self::EASE_IN_OUT),
            Easing::Bezier(ctrl) => bezier_ease_t(t, ctrl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn endpoints_are_fixed_for_every_curve() {
        for e in [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::Bezier([0.1, 0.7, 0.3, 0.9]),
        ] {
            approx(e.apply(0.0), 0.0, 1e-5);
            approx(e.apply(1.0), 1.0, 1e-5);
        }
    }

    #[test]
    fn ease_in_lags_and_ease_out_leads() {
        assert!(Easing::EaseIn.apply(0.5) < 0.5);
        assert!(Easing::EaseOut.apply(0.5) > 0.5);
        approx(Easing::EaseInOut.apply(0.5), 0.5, 1e-3);
    }

    #[test]
    fn step_holds_until_complete() {
        assert_eq!(Easing::Step.apply(0.99), 0.0);
        assert_eq!(Easing::Step.apply(1.0), 1.0);
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
        assert_eq!(Easing::Linear.apply(-1.0), 0.0);
        assert_eq!(Easing::Linear.apply(f32::NAN), 0.0);
    }
}
