//! TOML-based configuration for the floorsync client.
//!
//! The binary takes an optional path on the command line; without one it
//! looks for `floorsync.toml` in the working directory.  A missing file is
//! not an error: the client simply runs with defaults.
//!
//! ```toml
//! [network]
//! server_host = "game.example.net"
//! tcp_port = 7000
//! udp_port = 7001
//!
//! [player]
//! name = "nova"
//! team = "B"
//! character = 2
//! log_level = "debug"
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Every field carries `#[serde(default = "some_fn")]`, so a file that only
//! mentions the fields the user cares about still parses; everything else
//! falls back to the value returned by `some_fn()`.  Whole sections may be
//! left out too, thanks to `#[serde(default)]` on the top-level struct.

use std::path::{Path, PathBuf};
use std::time::Duration;

use floorsync_core::protocol::Team;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name used when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "floorsync.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub player: PlayerConfig,
}

/// Where the server lives and how the I/O workers behave.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Host name or IP literal of the game server.
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// Server port for the reliable (TCP) channel.
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,
    /// Server port for the unreliable (UDP) channel.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    /// Local UDP port to bind.  `0` lets the OS choose.
    #[serde(default)]
    pub local_udp_port: u16,
    /// Upper bound on one multiplexed wait in the receive worker.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Packets held by the receive worker between two data requests.
    #[serde(default = "default_max_queued_packets")]
    pub max_queued_packets: usize,
    /// Upper bound on one socket write in the send worker.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Who this client plays as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerConfig {
    #[serde(default = "default_player_name")]
    pub name: String,
    /// Preferred team announced in the lobby.
    #[serde(default)]
    pub team: Team,
    /// Character selector for non-team-A appearances.
    #[serde(default)]
    pub character: u8,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}
fn default_tcp_port() -> u16 {
    7000
}
fn default_udp_port() -> u16 {
    7001
}
fn default_poll_timeout_ms() -> u64 {
    100
}
fn default_max_queued_packets() -> usize {
    1024
}
fn default_send_timeout_ms() -> u64 {
    2000
}
fn default_player_name() -> String {
    "player".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_host: default_server_host(),
            tcp_port: default_tcp_port(),
            udp_port: default_udp_port(),
            local_udp_port: 0,
            poll_timeout_ms: default_poll_timeout_ms(),
            max_queued_packets: default_max_queued_packets(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: default_player_name(),
            team: Team::None,
            character: 0,
            log_level: default_log_level(),
        }
    }
}

impl NetworkConfig {
    /// [`NetworkConfig::poll_timeout_ms`] as a duration, never zero.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }

    /// [`NetworkConfig::send_timeout_ms`] as a duration, never zero.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }
}

// ── Load / save ───────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Loads the config at `path`, returning defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not found",
    /// and [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the config to `path` as pretty TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system failures or
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
