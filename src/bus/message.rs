use chrono::{DateTime, Local};
use std::fmt;

/// Inbound bus payload with its receive time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: DateTime<Local>,
}

impl BusMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: Local::now(),
        }
    }

    /// Milliseconds since the message was received
    pub fn age_ms(&self) -> i64 {
        (Local::now() - self.timestamp).num_milliseconds()
    }
}

impl fmt::Display for BusMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.payload.chars().take(40).collect();
        write!(f, "{} {}: {}", self.timestamp.format("%H:%M:%S%.3f"), self.topic, preview)
    }
}
