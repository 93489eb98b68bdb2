//! Numeric bounds and hysteresis checks applied before anything is published

use super::state::Direction;
use crate::config::ControlConfig;

pub const ANGLE_MIN: f64 = 0.0;
pub const ANGLE_MAX: f64 = 180.0;

/// Clamps a propulsion candidate to the range allowed for `direction`
///
/// Returns `None` while stopped: propulsion is frozen when not moving.
pub fn clamp_propulsion(
    candidate: f64,
    direction: Direction,
    config: &ControlConfig,
) -> Option<i32> {
    let (min, max) = match direction {
        Direction::Forward => (config.forward_min, config.forward_max),
        Direction::Reverse => (config.reverse_min, config.reverse_max),
        Direction::Stop => return None,
    };

    Some(candidate.clamp(min as f64, max as f64).floor() as i32)
}

/// Wire value for propulsion; the multiplier is applied after the clamp
pub fn publishable_propulsion(propulsion: i32, multiplier: i32, config: &ControlConfig) -> i32 {
    propulsion.clamp(config.propulsion_default, config.propulsion_max) * multiplier
}

pub fn clamp_angle(angle: f64) -> f64 {
    angle.clamp(ANGLE_MIN, ANGLE_MAX)
}

/// True once `next` has moved at least `threshold` away from `published`
pub fn exceeds_hysteresis(published: f64, next: f64, threshold: f64) -> bool {
    (next - published).abs() >= threshold
}

/// Orientation increment as sent on the wire: truncated, saturated to `i8`
pub fn orientation_increment(increment: f64, multiplier: i32) -> i8 {
    (increment * multiplier as f64) as i8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(45.0 + 10.0, Direction::Forward, Some(55))]
    #[case(45.0 + 200.0, Direction::Forward, Some(100))]
    #[case(45.0 - 200.0, Direction::Forward, Some(25))]
    #[case(45.0 + 10.0, Direction::Reverse, Some(50))]
    #[case(45.0 - 30.0, Direction::Reverse, Some(25))]
    #[case(45.0 + 2.7, Direction::Forward, Some(47))]
    #[case(45.0 + 10.0, Direction::Stop, None)]
    fn propulsion_stays_in_direction_bounds(
        #[case] candidate: f64,
        #[case] direction: Direction,
        #[case] expected: Option<i32>,
    ) {
        assert_eq!(
            clamp_propulsion(candidate, direction, &ControlConfig::default()),
            expected
        );
    }

    #[rstest]
    #[case(30, 1, 45)]
    #[case(55, 1, 55)]
    #[case(100, 1, 70)]
    #[case(55, -1, -55)]
    #[case(100, -1, -70)]
    fn published_propulsion_clamps_before_multiplier(
        #[case] propulsion: i32,
        #[case] multiplier: i32,
        #[case] expected: i32,
    ) {
        assert_eq!(
            publishable_propulsion(propulsion, multiplier, &ControlConfig::default()),
            expected
        );
    }

    #[rstest]
    #[case(95.0, 110.0, true)]
    #[case(95.0, 104.9, false)]
    #[case(90.0, 80.0, true)]
    #[case(90.0, 90.0, false)]
    fn hysteresis_uses_inclusive_threshold(
        #[case] published: f64,
        #[case] next: f64,
        #[case] expected: bool,
    ) {
        assert_eq!(exceeds_hysteresis(published, next, 10.0), expected);
    }

    #[test]
    fn angles_clamp_to_servo_range() {
        assert_eq!(clamp_angle(-12.0), 0.0);
        assert_eq!(clamp_angle(200.0), 180.0);
        assert_eq!(clamp_angle(110.0), 110.0);
    }

    #[test]
    fn orientation_increment_truncates_and_saturates() {
        assert_eq!(orientation_increment(2.9, 1), 2);
        assert_eq!(orientation_increment(3.0, -1), -3);
        assert_eq!(orientation_increment(500.0, 1), i8::MAX);
    }
}
