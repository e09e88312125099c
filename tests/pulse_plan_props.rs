//! Property tests for the pulse plan.

use emberdrive::power::plan::PulsePlan;
use proptest::prelude::*;

proptest! {
    /// For every interior level the realized duty ratio matches the
    /// requested level.
    #[test]
    fn duty_matches_level(level in 1.0f32..=99.0f32, m in 100u32..=5000u32) {
        let plan = PulsePlan::for_level(level, m);
        prop_assert!(!plan.always_on() && !plan.always_off());
        let duty = plan.duty();
        prop_assert!(
            (duty - level / 100.0).abs() < 0.005,
            "level {} m {}: on {} off {} duty {}",
            level, m, plan.on_ms, plan.off_ms, duty
        );
    }

    /// The scarcer interval is always pinned to exactly the minimum
    /// pulse width; the other interval is never narrower.
    #[test]
    fn minority_interval_is_the_minimum(level in 1.0f32..=99.0f32, m in 100u32..=5000u32) {
        let plan = PulsePlan::for_level(level, m);
        prop_assert_eq!(plan.on_ms.min(plan.off_ms), m);
        prop_assert!(plan.on_ms.max(plan.off_ms) >= m);
    }

    /// Above the upper boundary the plan saturates on.
    #[test]
    fn saturates_on_above_99(level in 99.01f32..=100.0f32, m in 100u32..=5000u32) {
        let plan = PulsePlan::for_level(level, m);
        prop_assert!(plan.always_on());
        prop_assert!((plan.duty() - 1.0).abs() < f32::EPSILON);
    }

    /// Below the lower boundary the plan saturates off.
    #[test]
    fn saturates_off_below_1(level in 0.0f32..=0.99f32, m in 100u32..=5000u32) {
        let plan = PulsePlan::for_level(level, m);
        prop_assert!(plan.always_off());
        prop_assert!(plan.duty().abs() < f32::EPSILON);
    }

    /// Duty is monotone in the level (coarse check over the whole range,
    /// allowing for integer rounding of the computed interval).
    #[test]
    fn duty_is_monotone(a in 1.0f32..=99.0f32, b in 1.0f32..=99.0f32) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let lo_duty = PulsePlan::for_level(lo, 2000).duty();
        let hi_duty = PulsePlan::for_level(hi, 2000).duty();
        prop_assert!(hi_duty >= lo_duty - 0.005, "{lo} -> {lo_duty}, {hi} -> {hi_duty}");
    }
}
