//! Message bus transport over MQTT
//!
//! ```text
//! bus/
//! ├── config.rs        - broker options and topic map
//! ├── message.rs       - inbound message envelope
//! ├── topics.rs        - topic naming and payload encoding
//! └── mqtt_handler.rs  - connection loop, routing and publishing
//! ```
//!
//! All channels use QoS 0: messages may be dropped and are never retried. A
//! newer message supersedes a lost one.

pub mod config;
pub mod message;
pub mod mqtt_handler;
pub mod topics;

pub use config::BusConfig;
pub use message::BusMessage;
pub use mqtt_handler::BusHandle;
pub use topics::{PeerKind, Topic, TopicMap};
