//! Reads newline-delimited JSON board events from a device, file or stdin

use super::BoardEvent;
use crate::error::NodeError;
use crate::node::NodeEvent;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const STDIN_DEVICE: &str = "-";

/// Parses one line into a board event; blank lines yield `Ok(None)`
pub fn parse_line(line: &str) -> Result<Option<BoardEvent>, NodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(line)? {
        Value::Object(fields) => Ok(Some(BoardEvent::new(fields))),
        other => Err(NodeError::MalformedPayload(format!(
            "board event must be an object, got {}",
            other
        ))),
    }
}

/// Forwards every parsed line until input ends, the node stops or the token fires
pub async fn read_events<R>(
    reader: R,
    event_sender: mpsc::Sender<NodeEvent>,
    token: CancellationToken,
) -> Result<usize, NodeError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut forwarded = 0;

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => {
                debug!("Board reader cancelled");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("Board input ended");
            break;
        };

        match parse_line(&line) {
            Ok(Some(event)) => {
                if event_sender.send(NodeEvent::Board(event)).await.is_err() {
                    debug!("Node stopped, board reader exiting");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping board line: {}", e),
        }
    }

    Ok(forwarded)
}

/// Handle for the board reader task
#[derive(Debug)]
pub struct BoardHandle {
    task_handle: Option<JoinHandle<Result<usize, NodeError>>>,
}

impl BoardHandle {
    pub async fn spawn(
        device: &str,
        event_sender: mpsc::Sender<NodeEvent>,
        token: CancellationToken,
    ) -> Result<Self, NodeError> {
        let task_handle = if device == STDIN_DEVICE {
            info!("Reading board events from stdin");
            tokio::spawn(read_events(tokio::io::stdin(), event_sender, token))
        } else {
            let file = tokio::fs::File::open(device)
                .await
                .map_err(|e| NodeError::Board(format!("Failed to open {}: {}", device, e)))?;
            info!("Reading board events from {}", device);
            tokio::spawn(read_events(file, event_sender, token))
        };

        Ok(Self {
            task_handle: Some(task_handle),
        })
    }

    pub async fn join(&mut self) -> Result<usize, NodeError> {
        match self.task_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| NodeError::Board(format!("board reader panicked: {}", e)))?,
            None => Ok(0),
        }
    }
}
