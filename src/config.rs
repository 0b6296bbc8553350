//! YAML configuration file support.
//!
//! All sections are optional and fall back to their defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! fingerprint:
//!   k: 17
//!   w: 23
//!
//! tokenizer:
//!   language: javascript
//!   strict: false
//!
//! snapshot:
//!   compression: zstd
//!   level: 3
//!
//! logging:
//!   level: info
//!   json: false
//! ```

use std::fs;
use std::path::Path;

use fingerprint::{FingerprintConfig, DEFAULT_K, DEFAULT_W};
use index::{CompressionCodec, CompressionConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokenizer::{Tokenizer, TokenizerKind};

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SimdexConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub fingerprint: FingerprintYamlConfig,

    #[serde(default)]
    pub tokenizer: TokenizerYamlConfig,

    #[serde(default)]
    pub snapshot: SnapshotYamlConfig,

    #[serde(default)]
    pub logging: LoggingYamlConfig,
}

impl SimdexConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SimdexConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.fingerprint.validate()?;
        self.snapshot.validate()?;
        Ok(())
    }

    /// Window parameters for a new index.
    pub fn fingerprint_config(&self) -> FingerprintConfig {
        FingerprintConfig::new(self.fingerprint.k, self.fingerprint.w)
    }

    pub fn build_tokenizer(&self) -> Box<dyn Tokenizer> {
        self.tokenizer.language.build(self.tokenizer.strict)
    }

    pub fn compression(&self) -> CompressionConfig {
        CompressionConfig::new(self.snapshot.compression, self.snapshot.level)
    }
}

impl Default for SimdexConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            fingerprint: FingerprintYamlConfig::default(),
            tokenizer: TokenizerYamlConfig::default(),
            snapshot: SnapshotYamlConfig::default(),
            logging: LoggingYamlConfig::default(),
        }
    }
}

/// Index window parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintYamlConfig {
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default = "default_w")]
    pub w: usize,
}

impl FingerprintYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        FingerprintConfig::new(self.k, self.w)
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("fingerprint: {e}")))
    }
}

impl Default for FingerprintYamlConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            w: default_w(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerYamlConfig {
    #[serde(default)]
    pub language: TokenizerKind,

    /// Reject sources that do not parse cleanly.
    #[serde(default)]
    pub strict: bool,
}

/// Snapshot file output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotYamlConfig {
    #[serde(default)]
    pub compression: CompressionCodec,

    #[serde(default = "default_level")]
    pub level: i32,
}

impl SnapshotYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.compression == CompressionCodec::Zstd && !(1..=22).contains(&self.level) {
            return Err(ConfigLoadError::Validation(format!(
                "snapshot.level must be within 1..=22 for zstd (got {})",
                self.level
            )));
        }
        Ok(())
    }
}

impl Default for SnapshotYamlConfig {
    fn default() -> Self {
        Self {
            compression: CompressionCodec::None,
            level: default_level(),
        }
    }
}

/// Log output for the command-line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_k() -> usize {
    DEFAULT_K
}
fn default_w() -> usize {
    DEFAULT_W
}
fn default_level() -> i32 {
    3
}
fn default_log_level() -> String {
    "info".to_string()
}
