pub mod audio;
pub mod board;
pub mod bus;
pub mod config;
pub mod control;
pub mod error;
pub mod net;
pub mod node;

use crate::audio::{AudioSink, TracingAudio};
use crate::board::reader::BoardHandle;
use crate::bus::{BusConfig, BusHandle};
use crate::config::NodeConfig;
use crate::node::{ControllerNode, NodeHandle};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const EVENT_QUEUE: usize = 256;
const COMMAND_QUEUE: usize = 256;
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config().await?;
    let address = net::resolve_local_address(&config.network.probe_address).await;

    let token = CancellationToken::new();
    let (event_sender, event_receiver) = mpsc::channel(EVENT_QUEUE);
    let (command_sender, command_receiver) = mpsc::channel(COMMAND_QUEUE);

    let mut bus = BusHandle::spawn(
        BusConfig::from_node_config(&config),
        event_sender.clone(),
        command_receiver,
    );

    let audio: Option<Box<dyn AudioSink>> = if config.audio.enabled {
        Some(Box::new(TracingAudio))
    } else {
        None
    };
    let node = ControllerNode::create(
        &config,
        address.to_string(),
        audio,
        event_receiver,
        command_sender,
    );
    let mut node_handle = NodeHandle::spawn(node, token.clone());

    let board = BoardHandle::spawn(&config.board.device, event_sender, token.clone()).await;
    let mut board = match board {
        Ok(board) => board,
        Err(e) => {
            error!("Board unavailable: {}", e);
            let _ = node_handle.shutdown().await;
            bus.join().await;
            return Err(eyre!("Failed to start board reader: {}", e));
        }
    };

    let mut bus_state = bus.subscribe();
    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, shutting down");
                break node_handle.shutdown().await;
            }

            result = node_handle.wait() => {
                break result;
            }

            Ok(()) = bus_state.changed() => {
                info!("Bus connection state: {:?}", *bus_state.borrow());
            }
        }
    };

    token.cancel();
    teardown(&mut board, &mut bus).await;

    match outcome {
        Ok(()) => {
            info!("Controller node shut down cleanly");
            Ok(())
        }
        Err(e) => {
            error!("Controller node failed: {}", e);
            Err(eyre!("Controller node failed: {}", e))
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// First CLI argument overrides the default config location
async fn load_config() -> Result<NodeConfig> {
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = NodeConfig::default_path();
            NodeConfig::ensure_default_config(&path)
                .await
                .map_err(|e| eyre!("Failed to create default config: {}", e))?;
            path
        }
    };

    let config = NodeConfig::load(&path)
        .await
        .map_err(|e| eyre!("Failed to load {}: {}", path.display(), e))?;
    info!("Peer index {}", config.node.peer_index);
    Ok(config)
}

async fn teardown(board: &mut BoardHandle, bus: &mut BusHandle) {
    match tokio::time::timeout(TEARDOWN_TIMEOUT, board.join()).await {
        Ok(Ok(forwarded)) => info!("Board reader forwarded {} events", forwarded),
        Ok(Err(e)) => warn!("Board reader ended with error: {}", e),
        Err(_) => warn!("Board reader did not stop in time"),
    }

    match tokio::time::timeout(TEARDOWN_TIMEOUT, bus.join()).await {
        Ok(status) => info!(
            "Bus closed: {} sent, {} received, {} dropped",
            status.messages_sent, status.messages_received, status.messages_dropped
        ),
        Err(_) => warn!("Bus did not stop in time"),
    }
}
