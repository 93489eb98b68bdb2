//! Sensor report exchange with the sibling platform
//!
//! Inbound reports only update the informational `peer_direction`; outbound
//! reports carry every board event, tagged with this node's index and address.

use super::publisher::OutboundCommand;
use super::state::ControlState;
use crate::board::{BoardEvent, SensorKey};
use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Envelope shared by inbound and outbound sensor reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    pub index: i64,
    pub datas: Map<String, Value>,
}

impl SensorReport {
    pub fn parse(payload: &str) -> Result<Self, NodeError> {
        serde_json::from_str(payload)
            .map_err(|e| NodeError::MalformedPayload(format!("sensor report: {}", e)))
    }
}

#[derive(Debug, Clone)]
pub struct PeerRelay {
    peer_index: u32,
    address: String,
    sensors_id: Option<i64>,
}

impl PeerRelay {
    pub fn new(peer_index: u32, address: String) -> Self {
        Self {
            peer_index,
            address,
            sensors_id: None,
        }
    }

    /// Merges a sibling report; only its `direction` field is consumed
    pub fn inbound(&self, state: &mut ControlState, payload: &str) -> Result<(), NodeError> {
        let report = SensorReport::parse(payload)?;

        match report.datas.get(SensorKey::Direction.as_str()) {
            Some(value) => {
                let direction = value.as_i64().ok_or_else(|| {
                    NodeError::MalformedPayload(format!(
                        "peer direction is not an integer: {}",
                        value
                    ))
                })?;
                debug!("Peer {} reports direction {}", report.index, direction);
                state.peer_direction = Some(direction);
            }
            None => debug!("Peer {} report carries no direction", report.index),
        }

        Ok(())
    }

    /// Wraps a board event into the outbound sensor report
    pub fn outbound(&mut self, event: &BoardEvent) -> Result<OutboundCommand, NodeError> {
        let peer_index = self.peer_index;
        let index = *self.sensors_id.get_or_insert(peer_index as i64);

        let mut datas = event.fields().clone();
        datas.insert(SensorKey::Ip.as_str().to_string(), Value::String(self.address.clone()));

        let payload = serde_json::to_string(&SensorReport { index, datas })?;
        Ok(OutboundCommand::Sensor(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlConfig;
    use serde_json::json;

    fn relay() -> (PeerRelay, ControlState) {
        (
            PeerRelay::new(2, "10.0.0.5".to_string()),
            ControlState::new(&ControlConfig::default()),
        )
    }

    #[test]
    fn inbound_direction_is_stored_without_touching_own_direction() {
        let (relay, mut state) = relay();

        relay
            .inbound(&mut state, r#"{"index": 1, "datas": {"direction": -1, "battery": 80}}"#)
            .unwrap();

        assert_eq!(state.peer_direction, Some(-1));
        assert_eq!(state.direction, crate::control::state::Direction::Stop);
    }

    #[test]
    fn inbound_without_envelope_is_malformed() {
        let (relay, mut state) = relay();

        let result = relay.inbound(&mut state, r#"{"datas": {"direction": 1}}"#);

        assert!(matches!(result, Err(NodeError::MalformedPayload(_))));
        assert_eq!(state.peer_direction, None);
    }

    #[test]
    fn outbound_report_tags_index_and_address() {
        let (mut relay, _) = relay();
        let fields = json!({"roll": 12.5, "short_press": false});
        let event = BoardEvent::new(fields.as_object().cloned().unwrap());

        let OutboundCommand::Sensor(payload) = relay.outbound(&event).unwrap() else {
            panic!("expected sensor command");
        };
        let report = SensorReport::parse(&payload).unwrap();

        assert_eq!(report.index, 2);
        assert_eq!(report.datas["ip"], json!("10.0.0.5"));
        assert_eq!(report.datas["roll"], json!(12.5));
        assert_eq!(report.datas["short_press"], json!(false));
    }

    #[test]
    fn report_envelope_round_trips_unknown_keys() {
        let raw = r#"{"index":3,"datas":{"direction":1,"lidar":[1,2,3],"nested":{"a":true}}}"#;
        let report = SensorReport::parse(raw).unwrap();
        let encoded = serde_json::to_value(&report).unwrap();

        assert_eq!(encoded, serde_json::from_str::<Value>(raw).unwrap());
    }
}
