use super::controller_node::{ControllerNode, Initializing};
use crate::error::NodeError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Runs a controller node in its own tokio task
///
/// The node stops when the token is cancelled, when its inbound channel
/// closes, or when the bus side goes away.
#[derive(Debug)]
pub struct NodeHandle {
    token: CancellationToken,
    task_handle: Option<JoinHandle<Result<(), NodeError>>>,
}

impl NodeHandle {
    pub fn spawn(node: ControllerNode<Initializing>, token: CancellationToken) -> Self {
        let node_token = token.clone();
        let task_handle = tokio::spawn(async move {
            let running = node.start();
            let draining = running.run_until_shutdown(node_token).await;
            draining.drain().map(|_stopped| ())
        });

        info!("Controller node task spawned");
        Self {
            token,
            task_handle: Some(task_handle),
        }
    }

    /// Waits for the node task to end; safe to drop and call again
    pub async fn wait(&mut self) -> Result<(), NodeError> {
        let Some(handle) = self.task_handle.as_mut() else {
            debug!("Node task already joined");
            return Ok(());
        };

        let joined = handle.await;
        self.task_handle = None;

        match joined {
            Ok(result) => {
                debug!("Node task completed");
                result
            }
            Err(e) => {
                error!("Node task panicked: {}", e);
                Err(NodeError::Channel(format!("node task panicked: {}", e)))
            }
        }
    }

    /// Cancels the node and waits for its teardown
    pub async fn shutdown(&mut self) -> Result<(), NodeError> {
        debug!("Sending shutdown signal to controller node");
        self.token.cancel();
        self.wait().await
    }
}
