//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`SEALWIRE_*`)
//! - CLI arguments (for the `sealwire` binary)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SealwireError};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-connection defaults
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Compression stage settings
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Stream helper limits and deadlines
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SealwireError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| SealwireError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Default config file location (`<config_dir>/sealwire/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sealwire").join("config.toml"))
    }

    /// Load the default config file if it exists, then apply env overrides
    pub fn load() -> Result<Self> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SEALWIRE_*` environment variables (unparseable values are ignored)
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(val) = env_parse("SEALWIRE_ENCRYPTION") {
            self.connection.encryption = val;
        }
        if let Some(val) = env_parse("SEALWIRE_COMPRESSION_LEVEL") {
            self.compression.level = val;
        }
        if let Some(val) = env_parse("SEALWIRE_MAX_DECOMPRESSED_LEN") {
            self.compression.max_decompressed_len = val;
        }
        if let Some(val) = env_parse("SEALWIRE_MAX_FRAME_LEN") {
            self.transport.max_frame_len = val;
        }
        if let Some(val) = env_parse("SEALWIRE_HANDSHAKE_TIMEOUT_SECS") {
            self.transport.handshake_timeout_secs = val;
        }
        if let Some(val) = env_parse("SEALWIRE_NODELAY") {
            self.transport.nodelay = val;
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.compression.level > 9 {
            return Err(SealwireError::Config(format!(
                "compression.level must be 0-9, got {}",
                self.compression.level
            )));
        }
        if self.transport.max_frame_len < crate::codec::MIN_SEALED_FRAME_LEN {
            return Err(SealwireError::Config(format!(
                "transport.max_frame_len too small: {}",
                self.transport.max_frame_len
            )));
        }
        if self.transport.handshake_timeout_secs == 0 {
            return Err(SealwireError::Config(
                "transport.handshake_timeout_secs must be positive".to_string(),
            ));
        }
        if self.transport.max_handshake_len == 0 {
            return Err(SealwireError::Config(
                "transport.max_handshake_len must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Per-connection defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Request encryption on new connections
    pub encryption: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { encryption: true }
    }
}

/// Compression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// gzip level (0-9)
    pub level: u32,

    /// Upper bound on decompressed output per message
    pub max_decompressed_len: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            level: 6,
            max_decompressed_len: 64 * 1024 * 1024, // 64 MB
        }
    }
}

/// Stream helper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest frame accepted from the stream (length prefix included)
    pub max_frame_len: usize,

    /// Largest handshake blob accepted from the stream
    pub max_handshake_len: usize,

    /// Deadline for a full handshake exchange
    pub handshake_timeout_secs: u64,

    /// Set TCP_NODELAY on TCP streams
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_frame_len: 16 * 1024 * 1024, // 16 MB
            max_handshake_len: 4096,
            handshake_timeout_secs: 10,
            nodelay: true,
        }
    }
}

impl TransportConfig {
    /// Handshake deadline as a `Duration`
    pub fn handshake_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.handshake_timeout_secs)
    }
}
