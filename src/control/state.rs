use crate::config::ControlConfig;
use std::fmt;

/// Travel direction sent on the `direction` channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    Reverse,
    #[default]
    Stop,
    Forward,
}

impl Direction {
    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Reverse => -1,
            Direction::Stop => 0,
            Direction::Forward => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Session lifecycle derived from master heartbeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Forced stop latched by the master
    Stopped,
    #[default]
    Idle,
    GameplayActive,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "Stopped"),
            SessionState::Idle => write!(f, "Idle"),
            SessionState::GameplayActive => write!(f, "GameplayActive"),
        }
    }
}

pub const CENTER_ANGLE: f64 = 90.0;

/// Actuator state owned by the node's dispatch loop
///
/// `pan_angle` and `tilt_angle` hold the last *published* pan-tilt pair, which
/// is what the hysteresis check compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub propulsion: i32,
    pub direction: Direction,
    pub orientation_multiplier: i32,
    pub propulsion_multiplier: i32,
    pub pan_angle: f64,
    pub tilt_angle: f64,
    /// Gates audio side effects only
    pub session_enabled: bool,
    pub forced_stop: bool,
    /// Accumulated absolute orientation increment since the last wheel cue
    pub wheel_audio_tick: f64,
    /// Last direction reported by the sibling platform, informational only
    pub peer_direction: Option<i64>,
}

impl ControlState {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            propulsion: config.propulsion_default,
            direction: Direction::Stop,
            orientation_multiplier: config.orientation_multiplier,
            propulsion_multiplier: config.propulsion_multiplier,
            pan_angle: CENTER_ANGLE,
            tilt_angle: CENTER_ANGLE,
            session_enabled: false,
            forced_stop: false,
            wheel_audio_tick: 0.0,
            peer_direction: None,
        }
    }

    /// Restores motion values to their defaults; session flags and multipliers survive
    pub fn reset(&mut self, propulsion_default: i32) {
        self.propulsion = propulsion_default;
        self.direction = Direction::Stop;
        self.pan_angle = CENTER_ANGLE;
        self.tilt_angle = CENTER_ANGLE;
    }
}
