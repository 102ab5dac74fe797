//! Server configuration: TOML file + CLI overrides.

use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;
use recd_core::{RecdError, RecdResult};

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub recording: RecordingSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            notification_capacity: default_notification_capacity(),
            shutdown_grace: default_shutdown_grace(),
        }
    }
}

/// `[recording]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingSection {
    #[serde(default = "default_recordings_dir")]
    pub dir: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for RecordingSection {
    fn default() -> Self {
        Self {
            dir: default_recordings_dir(),
            prefix: default_prefix(),
            extension: default_extension(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}
fn default_port() -> u16 {
    5000
}
fn default_max_connections() -> usize {
    256
}
fn default_notification_capacity() -> usize {
    64
}
fn default_shutdown_grace() -> u64 {
    10
}
fn default_recordings_dir() -> String {
    "./audio".to_string()
}
fn default_prefix() -> String {
    "audio".to_string()
}
fn default_extension() -> String {
    "webm".to_string()
}
fn default_max_frame_bytes() -> usize {
    1_048_576
}

/// Resolved server configuration (paths expanded, CLI overrides applied).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: usize,
    pub notification_capacity: usize,
    /// Seconds to wait for open recordings to finalize on shutdown.
    pub shutdown_grace: u64,
    pub recordings_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    pub max_frame_bytes: usize,
}

impl ServerConfig {
    /// Load config from TOML file, then apply CLI overrides.
    pub fn load(
        config_path: Option<&Path>,
        cli_host: Option<IpAddr>,
        cli_port: Option<u16>,
        cli_recordings_dir: Option<&str>,
        cli_max_connections: Option<usize>,
    ) -> RecdResult<Self> {
        let file_config = match config_path {
            Some(path) => {
                let expanded = expand_tilde(path);
                if expanded.exists() {
                    info!(path = %expanded.display(), "loading config file");
                    let content = std::fs::read_to_string(&expanded)?;
                    Self::parse(&content)?
                } else {
                    info!(path = %expanded.display(), "config file not found, using defaults");
                    ConfigFile::default()
                }
            }
            None => ConfigFile::default(),
        };

        let dir = cli_recordings_dir
            .map(|s| s.to_string())
            .unwrap_or(file_config.recording.dir);

        Ok(Self {
            host: cli_host.unwrap_or(file_config.server.host),
            port: cli_port.unwrap_or(file_config.server.port),
            max_connections: cli_max_connections.unwrap_or(file_config.server.max_connections),
            notification_capacity: file_config.server.notification_capacity,
            shutdown_grace: file_config.server.shutdown_grace,
            recordings_dir: expand_tilde_str(&dir),
            file_prefix: file_config.recording.prefix,
            file_extension: file_config.recording.extension,
            max_frame_bytes: file_config.recording.max_frame_bytes,
        })
    }

    fn parse(content: &str) -> RecdResult<ConfigFile> {
        toml::from_str::<ConfigFile>(content)
            .map_err(|e| RecdError::Config(format!("config parse error: {e}")))
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    expand_tilde_str(&s)
}

fn expand_tilde_str(s: &str) -> PathBuf {
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(s)
}
