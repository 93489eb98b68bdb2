//! Arbitration and fusion core
//!
//! Pure logic with no I/O. Every handler takes the node's [`ControlState`] by
//! exclusive reference and returns the effects it wants performed:
//!
//! ```text
//! board event ──► SensorFusionEngine ──┐
//! heartbeat  ──► SessionController  ──┼──► ControlState ──► ActuatorPublisher ──► NodeOutput
//! peer report ──► PeerRelay ──────────┘
//! ```
//!
//! 1. [`state`] - actuator state and direction/session enums
//! 2. [`clamp`] - bounds and hysteresis helpers
//! 3. [`fusion`] - board events to actuator updates
//! 4. [`session`] - heartbeat state machine
//! 5. [`publisher`] - state to outbound commands
//! 6. [`relay`] - sibling sensor report exchange

pub mod clamp;
pub mod fusion;
pub mod publisher;
pub mod relay;
pub mod session;
pub mod state;

pub use fusion::SensorFusionEngine;
pub use publisher::{ActuatorPublisher, OutboundCommand};
pub use relay::{PeerRelay, SensorReport};
pub use session::{HeartbeatMessage, PeerStatus, SessionController};
pub use state::{ControlState, Direction, SessionState};

use crate::audio::AudioCue;

/// Effect requested by a handler, performed by the node after the handler returns
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// Actuator or sensor command for the bus
    Command(OutboundCommand),
    /// One-shot audio cue
    Cue(AudioCue),
    /// Ambience follows the session after every heartbeat
    Ambience { enabled: bool, direction: Direction },
}
