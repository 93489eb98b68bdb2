//! Controller node lifecycle with statum typestates
//!
//! ```text
//! Initializing ──► Running ──► Draining ──► Stopped
//!                    │
//!        (cancel token or inbound channel closed)
//! ```
//!
//! The node owns the [`ControlCore`] and is the only place events are applied,
//! so control state is never touched from two call sites at once. Handlers are
//! pure; this loop performs their effects: commands go to the bus with
//! `try_send` (never blocking the loop), cues go to the audio sink.

use super::{ControlCore, NodeEvent};
use crate::audio::AudioSink;
use crate::config::NodeConfig;
use crate::control::{Direction, NodeOutput, OutboundCommand};
use crate::error::NodeError;
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[state]
#[derive(Debug, Clone)]
pub enum NodeLifecycle {
    Initializing, // Core built, channels attached
    Running,      // Dispatching events
    Draining,     // No new events, flushing effects
    Stopped,      // Collaborators torn down
}

#[machine]
pub struct ControllerNode<S: NodeLifecycle> {
    core: ControlCore,
    event_receiver: mpsc::Receiver<NodeEvent>,
    command_sender: Option<mpsc::Sender<OutboundCommand>>,
    audio: Option<Box<dyn AudioSink>>,
    dispatched: u64,
    failure: Option<NodeError>,
}

impl<S: NodeLifecycle> ControllerNode<S> {
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}

impl ControllerNode<Initializing> {
    pub fn create(
        config: &NodeConfig,
        address: String,
        audio: Option<Box<dyn AudioSink>>,
        event_receiver: mpsc::Receiver<NodeEvent>,
        command_sender: mpsc::Sender<OutboundCommand>,
    ) -> Self {
        info!(
            "Creating controller node peer_{} at {}",
            config.node.peer_index, address
        );
        if audio.is_none() {
            info!("Audio disabled, cues will be dropped");
        }

        Self::new(
            ControlCore::new(config, address),
            event_receiver,
            Some(command_sender),
            audio,
            0,
            None,
        )
    }

    pub fn start(self) -> ControllerNode<Running> {
        info!("Controller node running");
        self.transition()
    }
}

impl ControllerNode<Running> {
    /// Applies one event and performs its effects
    pub fn dispatch(&mut self, event: NodeEvent) -> Result<(), NodeError> {
        self.dispatched += 1;
        let outputs = self.core.handle(event);
        debug!("Event {} produced {} outputs", self.dispatched, outputs.len());

        for output in outputs {
            match output {
                NodeOutput::Command(command) => self.send_command(command)?,
                NodeOutput::Cue(cue) => {
                    if let Some(audio) = &self.audio {
                        audio.play_cue(cue);
                    }
                }
                NodeOutput::Ambience { enabled, direction } => {
                    if let Some(audio) = &self.audio {
                        audio.set_ambience(enabled, direction);
                    }
                }
            }
        }
        Ok(())
    }

    fn send_command(&self, command: OutboundCommand) -> Result<(), NodeError> {
        let Some(sender) = &self.command_sender else {
            return Err(NodeError::Channel("command sender already released".to_string()));
        };

        match sender.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => {
                warn!("Command queue full, dropping {:?}", command);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(NodeError::Channel(
                "bus command channel closed".to_string(),
            )),
        }
    }

    /// Dispatches events serially until cancelled or the inbound side closes
    pub async fn run_until_shutdown(
        mut self,
        token: CancellationToken,
    ) -> ControllerNode<Draining> {
        info!("Entering dispatch loop");

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    info!("Shutdown requested after {} events", self.dispatched);
                    break;
                }

                event = self.event_receiver.recv() => {
                    let Some(event) = event else {
                        info!("Event channel closed");
                        break;
                    };
                    if let Err(e) = self.dispatch(event) {
                        error!("Dispatch failed: {}", e);
                        self.failure = Some(e);
                        break;
                    }
                }
            }
        }

        self.transition()
    }
}

impl ControllerNode<Draining> {
    /// Stops accepting events and tears collaborators down
    ///
    /// Commands already handed to the bus stay queued there; releasing the
    /// sender lets the bus task flush them and finish.
    pub fn drain(mut self) -> Result<ControllerNode<Stopped>, NodeError> {
        self.event_receiver.close();
        let mut discarded = 0;
        while self.event_receiver.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            info!("Discarded {} queued events on shutdown", discarded);
        }

        self.command_sender.take();

        if let Some(audio) = &self.audio {
            audio.set_ambience(false, Direction::Stop);
        }

        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }

        info!("Controller node stopped after {} events", self.dispatched);
        Ok(self.transition())
    }
}
