//! Controller node composition root
//!
//! 1. [`dispatch`] - serial dispatch of one event into control effects
//! 2. [`controller_node`] - lifecycle machine owning the dispatch loop
//! 3. [`node_handle`] - spawn and shutdown of the node task
//!
//! ```text
//! BoardHandle ─┐
//!              ├─[NodeEvent]→ ControllerNode ─[OutboundCommand]→ BusHandle
//! BusHandle ───┘                   │
//!                                  └─► AudioSink
//! ```

pub mod controller_node;
pub mod dispatch;
pub mod node_handle;

pub use controller_node::ControllerNode;
pub use dispatch::ControlCore;
pub use node_handle::NodeHandle;

use crate::board::BoardEvent;
use crate::bus::message::BusMessage;

/// Everything the dispatch loop consumes, in bus delivery order
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Board(BoardEvent),
    Heartbeat(BusMessage),
    PeerSensor(BusMessage),
}
