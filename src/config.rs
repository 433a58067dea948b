//! Daemon configuration
//!
//! Loaded from TOML, by default `~/.config/keyglow/keyglow.toml`. A missing
//! file means defaults.
//!
//! ```toml
//! fps = 30
//!
//! [[blocks]]
//! name = "keys"
//! keys = 104
//!
//! [[effects]]
//! kind = "wave"
//! period_ms = 4000
//!
//! [[effects]]
//! kind = "breathe"
//! color = "#FF000080"
//! period_ms = 2000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::RgbaColor;
use crate::effect::{Breathe, Solid, Wave};
use crate::render::{shared, SharedRenderer};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid frame rate: {0}")]
    InvalidFps(u32),

    #[error("invalid effect period: {0} ms")]
    InvalidPeriod(u64),
}

/// A key block of the simulated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    pub keys: usize,
}

/// One entry of the effect stack, rendered in list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EffectConfig {
    Solid {
        color: String,
    },
    Breathe {
        color: String,
        #[serde(default = "default_period_ms")]
        period_ms: u64,
    },
    Wave {
        #[serde(default = "default_period_ms")]
        period_ms: u64,
    },
}

fn default_period_ms() -> u64 {
    3000
}

/// Longest accepted effect period: one day
const MAX_PERIOD_MS: u64 = 24 * 60 * 60 * 1000;

fn default_fps() -> u32 {
    30
}

fn default_blocks() -> Vec<BlockConfig> {
    vec![
        BlockConfig {
            name: "keys".into(),
            keys: 104,
        },
        BlockConfig {
            name: "multimedia".into(),
            keys: 8,
        },
    ]
}

fn parse_color(s: &str) -> Result<RgbaColor, ConfigError> {
    RgbaColor::parse(s).ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
}

impl EffectConfig {
    /// Instantiate the renderer this entry describes
    pub fn build(&self) -> Result<SharedRenderer, ConfigError> {
        Ok(match self {
            EffectConfig::Solid { color } => shared(Solid::new(parse_color(color)?)),
            EffectConfig::Breathe { color, period_ms } => {
                shared(Breathe::new(parse_color(color)?, *period_ms))
            }
            EffectConfig::Wave { period_ms } => shared(Wave::new(*period_ms)),
        })
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_blocks")]
    pub blocks: Vec<BlockConfig>,
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            blocks: default_blocks(),
            effects: vec![EffectConfig::Wave {
                period_ms: default_period_ms(),
            }],
        }
    }
}

impl DaemonConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyglow")
            .join("keyglow.toml")
    }

    /// Load config from a file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 || self.fps > 1000 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        for effect in &self.effects {
            let period_ms = match effect {
                EffectConfig::Solid { color } => {
                    parse_color(color)?;
                    None
                }
                EffectConfig::Breathe { color, period_ms } => {
                    parse_color(color)?;
                    Some(*period_ms)
                }
                EffectConfig::Wave { period_ms } => Some(*period_ms),
            };
            if let Some(ms) = period_ms {
                if ms == 0 || ms > MAX_PERIOD_MS {
                    return Err(ConfigError::InvalidPeriod(ms));
                }
            }
        }
        Ok(())
    }

    /// `(name, key count)` pairs, in block order
    pub fn layout(&self) -> Vec<(&str, usize)> {
        self.blocks
            .iter()
            .map(|b| (b.name.as_str(), b.keys))
            .collect()
    }

    /// Build the configured renderers, in order
    pub fn renderers(&self) -> Result<Vec<SharedRenderer>, ConfigError> {
        self.effects.iter().map(EffectConfig::build).collect()
    }
}
