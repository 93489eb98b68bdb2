use super::topics::TopicMap;
use crate::config::{BusSection, NodeConfig};
use rumqttc::MqttOptions;
use std::time::Duration;

/// Everything the bus task needs to connect and route
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    pub server: BusSection,
    pub topics: TopicMap,
    /// Pause after a connection error before polling again
    pub retry_delay_ms: u64,
}

impl BusConfig {
    pub fn from_node_config(config: &NodeConfig) -> Self {
        Self {
            server: config.bus.clone(),
            topics: TopicMap::new(config.node.peer_index),
            retry_delay_ms: 1000,
        }
    }

    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(
            self.server.client_id.clone(),
            self.server.host.clone(),
            self.server.port,
        );
        options
            .set_keep_alive(Duration::from_secs(self.server.keep_alive_secs))
            .set_clean_session(true);

        if let (Some(user), Some(password)) = (&self.server.user, &self.server.password) {
            options.set_credentials(user.clone(), password.clone());
        }

        options
    }
}
