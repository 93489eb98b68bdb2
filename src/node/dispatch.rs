use super::NodeEvent;
use crate::board::BoardEvent;
use crate::bus::message::BusMessage;
use crate::config::NodeConfig;
use crate::control::{
    session, ControlState, NodeOutput, PeerRelay, SensorFusionEngine, SessionController,
    SessionState,
};
use tracing::{debug, warn};

/// Owns the control state and applies one event at a time
pub struct ControlCore {
    state: ControlState,
    fusion: SensorFusionEngine,
    session: SessionController,
    relay: PeerRelay,
}

impl ControlCore {
    pub fn new(config: &NodeConfig, address: String) -> Self {
        let peer_index = config.node.peer_index;
        Self {
            state: ControlState::new(&config.control),
            fusion: SensorFusionEngine::new(config.control.clone()),
            session: SessionController::new(peer_index, config.control.clone()),
            relay: PeerRelay::new(peer_index, address),
        }
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn handle(&mut self, event: NodeEvent) -> Vec<NodeOutput> {
        match event {
            NodeEvent::Board(event) => self.on_board(event),
            NodeEvent::Heartbeat(message) => self.on_heartbeat(&message),
            NodeEvent::PeerSensor(message) => self.on_peer_sensor(&message),
        }
    }

    fn on_board(&mut self, event: BoardEvent) -> Vec<NodeOutput> {
        let snapshot = event.snapshot();
        let mut outputs = self.fusion.process(&mut self.state, &snapshot);

        match self.relay.outbound(&event) {
            Ok(command) => outputs.push(NodeOutput::Command(command)),
            Err(e) => warn!("Failed to encode sensor report: {}", e),
        }

        outputs
    }

    fn on_heartbeat(&mut self, message: &BusMessage) -> Vec<NodeOutput> {
        debug!("Heartbeat {} ({} ms old)", message, message.age_ms());
        match session::parse_or_warn(&message.payload) {
            Some(heartbeat) => self.session.on_heartbeat(&mut self.state, &heartbeat),
            None => Vec::new(),
        }
    }

    fn on_peer_sensor(&mut self, message: &BusMessage) -> Vec<NodeOutput> {
        if let Err(e) = self.relay.inbound(&mut self.state, &message.payload) {
            warn!("Dropping peer sensor report on {}: {}", message.topic, e);
        }
        Vec::new()
    }
}
