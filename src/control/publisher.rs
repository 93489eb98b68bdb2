//! Maps control state changes onto outbound actuator commands
//!
//! The publisher never touches the transport. It produces [`OutboundCommand`]
//! values which the node hands to the bus task.

use super::clamp;
use super::state::{ControlState, Direction};
use crate::config::ControlConfig;
use tracing::debug;

/// One command for one outbound channel
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundCommand {
    /// Clamped propulsion times the propulsion multiplier
    Propulsion(i32),
    Direction(Direction),
    /// Orientation increment, not an absolute angle
    Orientation(i8),
    PanTilt { tilt: f64, pan: f64 },
    /// JSON-encoded sensor report
    Sensor(String),
}

#[derive(Debug, Clone)]
pub struct ActuatorPublisher {
    config: ControlConfig,
}

impl ActuatorPublisher {
    pub fn new(config: ControlConfig) -> Self {
        Self { config }
    }

    pub fn propulsion(&self, state: &ControlState) -> OutboundCommand {
        OutboundCommand::Propulsion(clamp::publishable_propulsion(
            state.propulsion,
            state.propulsion_multiplier,
            &self.config,
        ))
    }

    /// Publishes the current direction after a button-driven change
    ///
    /// Suppressed while a forced stop is latched; the direction is pinned back
    /// to stop instead. A stop resets the motion values.
    pub fn direction(&self, state: &mut ControlState) -> Option<OutboundCommand> {
        if state.forced_stop {
            debug!(
                "Forced stop latched, dropping direction update to {}",
                state.direction
            );
            state.direction = Direction::Stop;
            return None;
        }

        if state.direction == Direction::Stop {
            state.reset(self.config.propulsion_default);
        }

        Some(OutboundCommand::Direction(state.direction))
    }

    /// Unconditional stop used by heartbeat-driven resets
    pub fn direction_reset(&self, state: &mut ControlState) -> OutboundCommand {
        state.reset(self.config.propulsion_default);
        OutboundCommand::Direction(Direction::Stop)
    }

    pub fn orientation(&self, state: &ControlState, increment: f64) -> Option<OutboundCommand> {
        if increment == 0.0 {
            return None;
        }
        Some(OutboundCommand::Orientation(clamp::orientation_increment(
            increment,
            state.orientation_multiplier,
        )))
    }

    pub fn pan_tilt(&self, state: &ControlState) -> OutboundCommand {
        OutboundCommand::PanTilt {
            tilt: state.tilt_angle,
            pan: state.pan_angle,
        }
    }
}
