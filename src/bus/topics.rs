//! Topic naming and outbound payload encoding
//!
//! Channels are namespaced `<peer-kind>_<index>/<topic>`; the master has no index.

use crate::control::OutboundCommand;
use crate::error::NodeError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    Master,
    User,
    Drone,
}

impl PeerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PeerKind::Master => "master",
            PeerKind::User => "user",
            PeerKind::Drone => "drone",
        }
    }

    pub fn namespace(self, index: Option<u32>) -> String {
        match index {
            Some(index) => format!("{}_{}", self.as_str(), index),
            None => self.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Heartbeat,
    Propulsion,
    Direction,
    Orientation,
    PanTilt,
    Sensor,
}

impl Topic {
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Heartbeat => "heartbeat",
            Topic::Propulsion => "propulsion",
            Topic::Direction => "direction",
            Topic::Orientation => "orientation",
            Topic::PanTilt => "pantilt",
            Topic::Sensor => "sensor",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-component vector on the pan-tilt channel: x = tilt, z = pan
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct PanTiltVector {
    x: f64,
    y: f64,
    z: f64,
}

/// Fully qualified topics for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMap {
    namespace: String,
    pub heartbeat: String,
    pub peer_sensor: String,
}

impl TopicMap {
    pub fn new(peer_index: u32) -> Self {
        Self {
            namespace: PeerKind::User.namespace(Some(peer_index)),
            heartbeat: format!("{}/{}", PeerKind::Master.namespace(None), Topic::Heartbeat),
            peer_sensor: format!(
                "{}/{}",
                PeerKind::Drone.namespace(Some(peer_index)),
                Topic::Sensor
            ),
        }
    }

    pub fn outbound(&self, topic: Topic) -> String {
        format!("{}/{}", self.namespace, topic)
    }

    pub fn inbound(&self) -> [&str; 2] {
        [self.heartbeat.as_str(), self.peer_sensor.as_str()]
    }

    /// Topic and payload for one outbound command
    pub fn encode(&self, command: &OutboundCommand) -> Result<(String, Vec<u8>), NodeError> {
        let (topic, payload) = match command {
            OutboundCommand::Propulsion(value) => (Topic::Propulsion, value.to_string()),
            OutboundCommand::Direction(direction) => {
                (Topic::Direction, direction.as_i8().to_string())
            }
            OutboundCommand::Orientation(increment) => (Topic::Orientation, increment.to_string()),
            OutboundCommand::PanTilt { tilt, pan } => (
                Topic::PanTilt,
                serde_json::to_string(&PanTiltVector {
                    x: *tilt,
                    y: 0.0,
                    z: *pan,
                })?,
            ),
            OutboundCommand::Sensor(report) => (Topic::Sensor, report.clone()),
        };

        Ok((self.outbound(topic), payload.into_bytes()))
    }
}
