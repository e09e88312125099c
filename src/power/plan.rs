//! Time-proportioning pulse plan.
//!
//! Converts a continuous power level in [0,100] into an on/off pulse
//! pair whose duty ratio equals `level / 100` exactly (within integer
//! rounding) while never producing a pulse narrower than the configured
//! minimum width `M`. The minimum width is always spent on the scarcer
//! interval; the other interval is computed to hit the target ratio.
//!
//! The branch boundaries (`> 99`, `>= 50`, `>= 1`) are the only guard
//! against division by zero; keep them exactly as written.

/// Hold duration for the saturated plans (always-on / always-off).
/// Far enough out that the free-running flip never fires before the
/// schedule is pushed again, and small enough that deadline arithmetic
/// on the wrapping tick counter stays well-behaved.
pub const HOLD_MS: u32 = 999_999;

/// An on/off timing pair. `on_ms == 0` means never on; `off_ms == 0`
/// means never off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePlan {
    pub on_ms: u32,
    pub off_ms: u32,
}

impl PulsePlan {
    /// Compute the plan for a power level with minimum pulse width
    /// `minimum_pulse_ms`.
    pub fn for_level(level: f32, minimum_pulse_ms: u32) -> Self {
        let m = minimum_pulse_ms as f32;
        if level > 99.0 {
            // Always on.
            Self {
                on_ms: HOLD_MS,
                off_ms: 0,
            }
        } else if level >= 50.0 {
            // On-majority: spend M on the off interval.
            Self {
                on_ms: (m * level / (100.0 - level)).round() as u32,
                off_ms: minimum_pulse_ms,
            }
        } else if level >= 1.0 {
            // Off-majority: spend M on the on interval.
            Self {
                on_ms: minimum_pulse_ms,
                off_ms: (m * (100.0 - level) / level).round() as u32,
            }
        } else {
            // Always off.
            Self {
                on_ms: 0,
                off_ms: HOLD_MS,
            }
        }
    }

    /// True when the output should stay asserted indefinitely.
    pub fn always_on(&self) -> bool {
        self.off_ms == 0
    }

    /// True when the output should stay released indefinitely.
    pub fn always_off(&self) -> bool {
        self.on_ms == 0
    }

    /// Realized duty ratio in [0,1].
    pub fn duty(&self) -> f32 {
        if self.always_on() {
            1.0
        } else if self.always_off() {
            0.0
        } else {
            self.on_ms as f32 / (self.on_ms + self.off_ms) as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: u32 = 2000;

    #[test]
    fn full_power_is_always_on() {
        for level in [100.0, 99.9, 99.001] {
            let plan = PulsePlan::for_level(level, M);
            assert!(plan.always_on(), "level {level} should be always on");
            assert_eq!(plan.off_ms, 0);
        }
    }

    #[test]
    fn zero_power_is_always_off() {
        for level in [0.0, 0.5, 0.999] {
            let plan = PulsePlan::for_level(level, M);
            assert!(plan.always_off(), "level {level} should be always off");
            assert_eq!(plan.on_ms, 0);
        }
    }

    #[test]
    fn boundary_50_uses_on_majority_branch() {
        // 50.0 must land in the on-majority branch: off = M, on computed.
        let plan = PulsePlan::for_level(50.0, M);
        assert_eq!(plan.off_ms, M);
        assert_eq!(plan.on_ms, M); // M * 50 / 50
    }

    #[test]
    fn boundary_1_uses_off_majority_branch() {
        // 1.0 must land in the off-majority branch, not always-off.
        let plan = PulsePlan::for_level(1.0, M);
        assert_eq!(plan.on_ms, M);
        assert_eq!(plan.off_ms, M * 99);
    }

    #[test]
    fn boundary_99_uses_on_majority_branch() {
        let plan = PulsePlan::for_level(99.0, M);
        assert_eq!(plan.off_ms, M);
        assert_eq!(plan.on_ms, M * 99);
    }

    #[test]
    fn on_majority_levels_pin_off_to_minimum() {
        for level in [55.0, 60.0, 75.0, 90.0] {
            let plan = PulsePlan::for_level(level, M);
            assert_eq!(plan.off_ms, M);
            assert!(plan.on_ms >= M);
        }
    }

    #[test]
    fn off_majority_levels_pin_on_to_minimum() {
        for level in [2.0, 10.0, 20.0, 45.0] {
            let plan = PulsePlan::for_level(level, M);
            assert_eq!(plan.on_ms, M);
            assert!(plan.off_ms >= M);
        }
    }

    #[test]
    fn duty_matches_level() {
        for level in [5.0f32, 20.0, 33.3, 50.0, 66.6, 75.0, 95.0] {
            let plan = PulsePlan::for_level(level, M);
            let duty = plan.duty();
            assert!(
                (duty - level / 100.0).abs() < 0.001,
                "level {level}: duty {duty}"
            );
        }
    }

    #[test]
    fn exact_duty_at_75_and_20() {
        let plan = PulsePlan::for_level(75.0, M);
        assert_eq!((plan.on_ms, plan.off_ms), (3 * M, M)); // 3:1 → 75%
        let plan = PulsePlan::for_level(20.0, M);
        assert_eq!((plan.on_ms, plan.off_ms), (M, 4 * M)); // 1:4 → 20%
    }
}
