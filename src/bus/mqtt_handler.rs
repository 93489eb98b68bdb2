use super::config::BusConfig;
use super::message::BusMessage;
use super::topics::TopicMap;
use crate::control::OutboundCommand;
use crate::node::NodeEvent;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DISCONNECT_GRACE_MS: u64 = 500;

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Failed,
}

#[derive(Clone, Debug, Default)]
pub struct BusStatus {
    pub connection_state: ConnectionState,
    pub messages_received: usize,
    pub messages_sent: usize,
    pub messages_dropped: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

/// Maps an inbound publish onto a node event
pub fn route(topics: &TopicMap, topic: &str, payload: &[u8]) -> Option<NodeEvent> {
    let payload = match std::str::from_utf8(payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Dropping non UTF-8 payload on {}: {}", topic, e);
            return None;
        }
    };

    let message = BusMessage::from_topic(topic, payload);
    if topic == topics.heartbeat {
        Some(NodeEvent::Heartbeat(message))
    } else if topic == topics.peer_sensor {
        Some(NodeEvent::PeerSensor(message))
    } else {
        debug!("Ignoring message on unrouted topic {}", topic);
        None
    }
}

/// Polls the MQTT event loop and forwards inbound traffic to the node
struct InboundLoop {
    eventloop: EventLoop,
    client: AsyncClient,
    config: BusConfig,
    event_sender: mpsc::Sender<NodeEvent>,
    status: BusStatus,
    status_sender: watch::Sender<ConnectionState>,
}

impl InboundLoop {
    async fn run(mut self, done: CancellationToken) -> BusStatus {
        loop {
            tokio::select! {
                _ = done.cancelled() => {
                    self.finish().await;
                    break;
                }

                event = self.eventloop.poll() => self.on_event(event).await,
            }
        }

        self.set_state(ConnectionState::Disconnected);
        info!(
            "Bus inbound loop finished: {} received, {} dropped",
            self.status.messages_received, self.status.messages_dropped
        );
        self.status
    }

    async fn on_event(&mut self, event: Result<Event, ConnectionError>) {
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(
                    "Connected to {}:{}",
                    self.config.server.host, self.config.server.port
                );
                self.set_state(ConnectionState::Connected);
                self.subscribe();
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                self.status.messages_received += 1;
                self.status.last_activity = Some(chrono::Local::now());
                if let Some(event) = route(&self.config.topics, &publish.topic, &publish.payload) {
                    self.forward(event);
                }
            }
            Ok(other) => debug!("Bus event: {:?}", other),
            Err(e) => {
                error!("Bus connection error: {}", e);
                self.set_state(ConnectionState::Failed);
                tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
            }
        }
    }

    fn subscribe(&self) {
        for topic in self.config.topics.inbound() {
            match self.client.try_subscribe(topic, QoS::AtMostOnce) {
                Ok(()) => info!("Subscribed to {}", topic),
                Err(e) => warn!("Failed to subscribe to {}: {}", topic, e),
            }
        }
    }

    fn forward(&mut self, event: NodeEvent) {
        match self.event_sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.status.messages_dropped += 1;
                warn!("Node queue full, dropping inbound message");
            }
            Err(TrySendError::Closed(_)) => debug!("Node stopped, dropping inbound message"),
        }
    }

    /// Keeps polling until the queued disconnect goes out or the grace period ends
    async fn finish(&mut self) {
        let drain = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Event loop closed during shutdown: {}", e);
                        break;
                    }
                }
            }
        };

        if tokio::time::timeout(Duration::from_millis(DISCONNECT_GRACE_MS), drain)
            .await
            .is_err()
        {
            warn!("Disconnect did not complete within {} ms", DISCONNECT_GRACE_MS);
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.status.connection_state != state {
            self.status.connection_state = state;
            let _ = self.status_sender.send(state);
        }
    }
}

/// Publishes commands from the node until the node releases its sender
async fn run_outbound(
    client: AsyncClient,
    topics: TopicMap,
    mut command_receiver: mpsc::Receiver<OutboundCommand>,
    done: CancellationToken,
) -> usize {
    let mut sent = 0;

    while let Some(command) = command_receiver.recv().await {
        let (topic, payload) = match topics.encode(&command) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", command, e);
                continue;
            }
        };

        match client.try_publish(topic.as_str(), QoS::AtMostOnce, false, payload) {
            Ok(()) => {
                sent += 1;
                debug!("Published on {}", topic);
            }
            Err(e) => warn!("Publish on {} failed, not retrying: {}", topic, e),
        }
    }

    info!("Command channel closed after {} publications, disconnecting", sent);
    if let Err(e) = client.try_disconnect() {
        debug!("Disconnect request failed: {}", e);
    }
    done.cancel();
    sent
}

/// Handle for the bus tasks
///
/// The bus runs until the node drops its command sender, so every command
/// the node queued before stopping is still published.
#[derive(Debug)]
pub struct BusHandle {
    status_receiver: watch::Receiver<ConnectionState>,
    inbound_handle: Option<JoinHandle<BusStatus>>,
    outbound_handle: Option<JoinHandle<usize>>,
}

impl BusHandle {
    pub fn spawn(
        config: BusConfig,
        event_sender: mpsc::Sender<NodeEvent>,
        command_receiver: mpsc::Receiver<OutboundCommand>,
    ) -> Self {
        info!(
            "Spawning bus client {} for {}:{}",
            config.server.client_id, config.server.host, config.server.port
        );

        let (client, eventloop) = AsyncClient::new(config.mqtt_options(), config.server.capacity);
        let (status_sender, status_receiver) = watch::channel(ConnectionState::Disconnected);
        let done = CancellationToken::new();

        let outbound_handle = tokio::spawn(run_outbound(
            client.clone(),
            config.topics.clone(),
            command_receiver,
            done.clone(),
        ));

        let inbound = InboundLoop {
            eventloop,
            client,
            config,
            event_sender,
            status: BusStatus::default(),
            status_sender,
        };
        let inbound_handle = tokio::spawn(inbound.run(done));

        Self {
            status_receiver,
            inbound_handle: Some(inbound_handle),
            outbound_handle: Some(outbound_handle),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.status_receiver.clone()
    }

    /// Waits for both bus tasks to finish
    pub async fn join(&mut self) -> BusStatus {
        let sent = match self.outbound_handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                error!("Bus outbound task panicked: {}", e);
                0
            }),
            None => 0,
        };

        let mut status = match self.inbound_handle.take() {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                error!("Bus inbound task panicked: {}", e);
                BusStatus::default()
            }),
            None => BusStatus::default(),
        };

        status.messages_sent = sent;
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;

    #[test]
    fn routes_inbound_topics_to_node_events() {
        let topics = TopicMap::new(1);

        assert!(matches!(
            route(&topics, "master/heartbeat", b"{}"),
            Some(NodeEvent::Heartbeat(_))
        ));
        assert!(matches!(
            route(&topics, "drone_1/sensor", br#"{"index":1,"datas":{}}"#),
            Some(NodeEvent::PeerSensor(message)) if message.payload.contains("datas")
        ));
        assert!(route(&topics, "drone_2/sensor", b"{}").is_none());
        assert!(route(&topics, "master/heartbeat", &[0xff, 0xfe]).is_none());
    }

    #[tokio::test]
    async fn bus_finishes_once_node_releases_commands_without_broker() {
        let mut node_config = NodeConfig::default();
        node_config.bus.host = "127.0.0.1".to_string();
        node_config.bus.port = 1;
        let mut config = BusConfig::from_node_config(&node_config);
        config.retry_delay_ms = 10;

        let (event_tx, _event_rx) = mpsc::channel(4);
        let (command_tx, command_rx) = mpsc::channel(4);
        let mut bus = BusHandle::spawn(config, event_tx, command_rx);

        command_tx
            .send(OutboundCommand::Direction(crate::control::Direction::Stop))
            .await
            .unwrap();
        drop(command_tx);

        let status = tokio::time::timeout(Duration::from_secs(5), bus.join())
            .await
            .unwrap();
        assert_eq!(status.messages_sent, 1);
        assert_eq!(status.connection_state, ConnectionState::Disconnected);
    }
}
