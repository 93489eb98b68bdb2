//! Node configuration loaded from `node.toml`
//!
//! Every section falls back to defaults so a partial file is enough. The
//! configuration is read once at startup and handed out as clones; nothing
//! mutates it afterwards.

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "rovercontrol";
const CONFIG_FILE: &str = "node.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub control: ControlConfig,
    pub bus: BusSection,
    pub board: BoardSection,
    pub audio: AudioSection,
    pub network: NetworkSection,
}

/// Identity of this node on the bus
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct NodeSection {
    pub peer_index: u32,
}

/// Clamp bounds, multipliers and thresholds used by the control core
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Propulsion after a reset, also the lowest published value
    pub propulsion_default: i32,
    /// Highest published propulsion value
    pub propulsion_max: i32,
    pub forward_min: i32,
    pub forward_max: i32,
    pub reverse_min: i32,
    pub reverse_max: i32,
    pub orientation_multiplier: i32,
    pub propulsion_multiplier: i32,
    pub tilt_multiplier: f64,
    pub pan_multiplier: f64,
    /// Minimum angle change (degrees) before a new pan-tilt pair is published
    pub pan_tilt_threshold: f64,
    /// Accumulated absolute orientation increment that triggers a wheel cue
    pub wheel_audio_threshold: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            propulsion_default: 45,
            propulsion_max: 70,
            forward_min: 25,
            forward_max: 100,
            reverse_min: 25,
            reverse_max: 50,
            orientation_multiplier: 1,
            propulsion_multiplier: 1,
            tilt_multiplier: 1.0,
            pan_multiplier: 1.0,
            pan_tilt_threshold: 10.0,
            wheel_audio_threshold: 30.0,
        }
    }
}

/// MQTT broker connection settings
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BusSection {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub capacity: usize,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "rovercontrol".to_string(),
            keep_alive_secs: 5,
            capacity: 100,
            user: None,
            password: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BoardSection {
    /// Device or file delivering newline-delimited JSON, `-` for stdin
    pub device: String,
}

impl Default for BoardSection {
    fn default() -> Self {
        Self {
            device: "-".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AudioSection {
    pub enabled: bool,
}

impl Default for AudioSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NetworkSection {
    /// External address used to discover the outbound interface
    pub probe_address: String,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            probe_address: "8.8.8.8:80".to_string(),
        }
    }
}

impl NodeConfig {
    /// Default location: `<config_dir>/rovercontrol/node.toml`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Writes a default config file if none exists at `path`
    pub async fn ensure_default_config(path: &Path) -> Result<(), NodeError> {
        if tokio::fs::try_exists(path).await? {
            debug!("Config file present at {}", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(&NodeConfig::default())
            .map_err(|e| NodeError::Config(format!("Failed to serialize default config: {}", e)))?;
        tokio::fs::write(path, content).await?;

        info!("Wrote default config to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, NodeError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            NodeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, NodeError> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.control.validate()?;

        if self.bus.host.is_empty() {
            return Err(NodeError::Config("bus.host cannot be empty".to_string()));
        }
        if self.bus.capacity == 0 {
            return Err(NodeError::Config("bus.capacity must be positive".to_string()));
        }
        if self.board.device.is_empty() {
            return Err(NodeError::Config("board.device cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), NodeError> {
        for (name, value) in [
            ("orientation_multiplier", self.orientation_multiplier),
            ("propulsion_multiplier", self.propulsion_multiplier),
        ] {
            if value != 1 && value != -1 {
                return Err(NodeError::Config(format!(
                    "{} must be 1 or -1, got {}",
                    name, value
                )));
            }
        }

        for (name, min, max) in [
            ("propulsion", self.propulsion_default, self.propulsion_max),
            ("forward", self.forward_min, self.forward_max),
            ("reverse", self.reverse_min, self.reverse_max),
        ] {
            if min > max {
                return Err(NodeError::Config(format!(
                    "{} bounds inverted: {} > {}",
                    name, min, max
                )));
            }
        }

        if self.pan_tilt_threshold <= 0.0 {
            return Err(NodeError::Config(
                "pan_tilt_threshold must be positive".to_string(),
            ));
        }
        if self.wheel_audio_threshold <= 0.0 {
            return Err(NodeError::Config(
                "wheel_audio_threshold must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
