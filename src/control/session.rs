//! Session lifecycle driven by master heartbeats
//!
//! Every heartbeat either confirms this peer's session directives or fails safe:
//! a missing `peers` field, a missing entry for this peer, or an entry without
//! both `enable` and `playtime` disables gameplay and stops the platform.

use super::NodeOutput;
use super::publisher::ActuatorPublisher;
use super::state::{ControlState, Direction, SessionState};
use crate::config::ControlConfig;
use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Directives for this peer, read from its own heartbeat entry only
///
/// Keys are checked for presence; a `playtime` of any value (even `null`)
/// counts. An entry that is not an object carries no directives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerStatus {
    pub stop: Option<bool>,
    /// Present when `enable` is; only a literal `true` enables gameplay
    pub enable: Option<bool>,
    pub has_playtime: bool,
}

impl PeerStatus {
    pub fn from_entry(entry: &Value) -> Self {
        let Some(fields) = entry.as_object() else {
            return Self::default();
        };

        Self {
            stop: fields.get("stop").and_then(Value::as_bool),
            enable: fields.get("enable").map(|value| value.as_bool() == Some(true)),
            has_playtime: fields.contains_key("playtime"),
        }
    }

    /// Both `enable` and `playtime` keys were present
    pub fn has_directives(&self) -> bool {
        self.enable.is_some() && self.has_playtime
    }
}

/// Heartbeat envelope; sibling entries stay raw and are never inspected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    #[serde(default)]
    pub peers: Option<Map<String, Value>>,
}

impl HeartbeatMessage {
    pub fn parse(payload: &str) -> Result<Self, NodeError> {
        serde_json::from_str(payload)
            .map_err(|e| NodeError::MalformedPayload(format!("heartbeat: {}", e)))
    }

    pub fn status(&self, peer_key: &str) -> Option<PeerStatus> {
        self.peers
            .as_ref()
            .and_then(|peers| peers.get(peer_key))
            .map(PeerStatus::from_entry)
    }
}

#[derive(Debug, Clone)]
pub struct SessionController {
    peer_key: String,
    publisher: ActuatorPublisher,
    session: SessionState,
}

impl SessionController {
    pub fn new(peer_index: u32, config: ControlConfig) -> Self {
        Self {
            peer_key: format!("peer_{}", peer_index),
            publisher: ActuatorPublisher::new(config),
            session: SessionState::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session
    }

    pub fn on_heartbeat(
        &mut self,
        state: &mut ControlState,
        heartbeat: &HeartbeatMessage,
    ) -> Vec<NodeOutput> {
        let mut reset_needed = false;

        match heartbeat.status(&self.peer_key) {
            Some(status) => {
                if let Some(stop) = status.stop {
                    state.forced_stop = stop;
                    if stop && state.direction != Direction::Stop {
                        info!("Forced stop from master");
                        reset_needed = true;
                    }
                }

                match status.enable {
                    Some(enable) if status.has_playtime => state.session_enabled = enable,
                    _ => {
                        debug!("Status for {} lacks enable/playtime, failing safe", self.peer_key);
                        state.session_enabled = false;
                        reset_needed = true;
                    }
                }
            }
            None => {
                if heartbeat.peers.is_none() {
                    debug!("Heartbeat without peers, failing safe");
                } else {
                    debug!("Heartbeat has no entry for {}, failing safe", self.peer_key);
                }
                state.session_enabled = false;
                reset_needed = true;
            }
        }

        let mut outputs = Vec::new();
        if reset_needed {
            outputs.push(NodeOutput::Command(self.publisher.direction_reset(state)));
        }

        self.update_session(state);

        outputs.push(NodeOutput::Ambience {
            enabled: state.session_enabled,
            direction: state.direction,
        });
        outputs
    }

    fn update_session(&mut self, state: &ControlState) {
        let next = if state.forced_stop {
            SessionState::Stopped
        } else if state.session_enabled {
            SessionState::GameplayActive
        } else {
            SessionState::Idle
        };

        if next != self.session {
            info!("Session state {} -> {}", self.session, next);
            self.session = next;
        }
    }
}

/// Parses a raw heartbeat payload, logging and dropping it when malformed
pub fn parse_or_warn(payload: &str) -> Option<HeartbeatMessage> {
    match HeartbeatMessage::parse(payload) {
        Ok(heartbeat) => Some(heartbeat),
        Err(e) => {
            warn!("Dropping heartbeat: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::publisher::OutboundCommand;

    fn setup() -> (SessionController, ControlState) {
        let config = ControlConfig::default();
        (SessionController::new(0, config.clone()), ControlState::new(&config))
    }

    fn resets(outputs: &[NodeOutput]) -> usize {
        outputs
            .iter()
            .filter(|o| **o == NodeOutput::Command(OutboundCommand::Direction(Direction::Stop)))
            .count()
    }

    fn moving_state(state: &mut ControlState) {
        state.direction = Direction::Forward;
        state.propulsion = 60;
        state.session_enabled = true;
    }

    #[test]
    fn enable_with_playtime_activates_gameplay() {
        let (mut session, mut state) = setup();
        let heartbeat = HeartbeatMessage::parse(
            r#"{"peers": {"peer_0": {"enable": true, "playtime": 600}}}"#,
        )
        .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert!(state.session_enabled);
        assert_eq!(session.state(), SessionState::GameplayActive);
        assert_eq!(
            outputs,
            vec![NodeOutput::Ambience {
                enabled: true,
                direction: Direction::Stop
            }]
        );
    }

    #[test]
    fn missing_peers_fails_safe_once() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);

        let outputs = session.on_heartbeat(&mut state, &HeartbeatMessage::parse("{}").unwrap());

        assert_eq!(resets(&outputs), 1);
        assert_eq!(state.direction, Direction::Stop);
        assert_eq!(state.propulsion, 45);
        assert!(!state.session_enabled);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn missing_own_entry_fails_safe() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat = HeartbeatMessage::parse(
            r#"{"peers": {"peer_4": {"enable": true, "playtime": 600}}}"#,
        )
        .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(resets(&outputs), 1);
        assert_eq!(state.direction, Direction::Stop);
    }

    #[test]
    fn enable_without_playtime_fails_safe() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat =
            HeartbeatMessage::parse(r#"{"peers": {"peer_0": {"enable": true}}}"#).unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(resets(&outputs), 1);
        assert!(!state.session_enabled);
    }

    #[test]
    fn stop_with_fail_safe_publishes_single_reset() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat =
            HeartbeatMessage::parse(r#"{"peers": {"peer_0": {"stop": true}}}"#).unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(resets(&outputs), 1);
        assert!(state.forced_stop);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn stop_keeps_gameplay_flag_when_directives_complete() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat = HeartbeatMessage::parse(
            r#"{"peers": {"peer_0": {"stop": true, "enable": true, "playtime": 10}}}"#,
        )
        .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(resets(&outputs), 1);
        assert!(state.session_enabled);
        assert_eq!(state.direction, Direction::Stop);

        let release = HeartbeatMessage::parse(
            r#"{"peers": {"peer_0": {"stop": false, "enable": true, "playtime": 10}}}"#,
        )
        .unwrap();
        let outputs = session.on_heartbeat(&mut state, &release);
        assert_eq!(resets(&outputs), 0);
        assert!(!state.forced_stop);
        assert_eq!(session.state(), SessionState::GameplayActive);
    }

    #[test]
    fn malformed_heartbeat_is_rejected() {
        assert!(matches!(
            HeartbeatMessage::parse("not json"),
            Err(NodeError::MalformedPayload(_))
        ));
        assert!(parse_or_warn(r#"{"peers": 5}"#).is_none());
    }

    #[test]
    fn odd_sibling_entry_does_not_hide_own_stop() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat = parse_or_warn(
            r#"{"peers": {
                "peer_0": {"stop": true, "enable": true, "playtime": 5},
                "peer_1": {"enable": 1, "playtime": 5},
                "peer_2": "offline"
            }}"#,
        )
        .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(resets(&outputs), 1);
        assert!(state.forced_stop);
        assert_eq!(state.direction, Direction::Stop);
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(matches!(outputs.last(), Some(NodeOutput::Ambience { .. })));
    }

    #[test]
    fn null_playtime_still_counts_as_present() {
        let (mut session, mut state) = setup();
        let heartbeat =
            HeartbeatMessage::parse(r#"{"peers": {"peer_0": {"enable": true, "playtime": null}}}"#)
                .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert!(state.session_enabled);
        assert_eq!(resets(&outputs), 0);
        assert_eq!(session.state(), SessionState::GameplayActive);
    }

    #[test]
    fn non_object_own_entry_fails_safe() {
        let (mut session, mut state) = setup();
        moving_state(&mut state);
        let heartbeat = HeartbeatMessage::parse(r#"{"peers": {"peer_0": [true]}}"#).unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert_eq!(heartbeat.status("peer_0"), Some(PeerStatus::default()));
        assert_eq!(resets(&outputs), 1);
        assert!(!state.session_enabled);
    }

    #[test]
    fn non_boolean_enable_keeps_gameplay_off_without_reset() {
        let (mut session, mut state) = setup();
        let heartbeat =
            HeartbeatMessage::parse(r#"{"peers": {"peer_0": {"enable": "yes", "playtime": 3}}}"#)
                .unwrap();

        let outputs = session.on_heartbeat(&mut state, &heartbeat);

        assert!(!state.session_enabled);
        assert_eq!(resets(&outputs), 0);
    }
}
