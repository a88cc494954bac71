//! Configuration file support for chaindbgd
//!
//! Loads and validates chaindbgd configuration from TOML files.
//! Default location: /etc/chaindbg/chaindbgd.toml

use crate::error::{ChaindbgError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/chaindbg/chaindbgd.toml";

/// Where diagnostic lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Through the tracing subscriber (system log)
    Log,
    /// Raw lines on stdout
    Stdout,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Full,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log line format
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_sink")]
    pub sink: SinkKind,
}

/// Netlink socket configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetlinkConfig {
    /// Socket receive buffer size in bytes
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,

    /// Request a link dump at startup so existing devices are reported
    #[serde(default = "default_dump_on_start")]
    pub dump_on_start: bool,
}

/// Complete chaindbgd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChaindbgConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub netlink: NetlinkConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

fn default_sink() -> SinkKind {
    SinkKind::Log
}

fn default_recv_buffer_size() -> usize {
    1024 * 1024
}

fn default_dump_on_start() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: default_sink(),
        }
    }
}

impl Default for NetlinkConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: default_recv_buffer_size(),
            dump_on_start: default_dump_on_start(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ChaindbgConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content).map_err(|e| {
                    ChaindbgError::Configuration(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "chaindbgd: Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ChaindbgError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ChaindbgError::Configuration(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        if self.netlink.recv_buffer_size < 4096 {
            return Err(ChaindbgError::Configuration(
                "recv_buffer_size must be >= 4096".to_string(),
            ));
        }

        Ok(())
    }
}
