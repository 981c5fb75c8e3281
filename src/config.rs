//! Tunables for the ping map and the probe driver
//!
//! Defaults match the built-in behaviour of `-x ...:m`. A `pingexit.toml`
//! file can override them:
//!
//! ```toml
//! [map]
//! default_size = 100   # max map size when `m` has no size argument
//! initial_max = 512    # largest initial allocation
//! extension = 512      # growth step once the initial allocation is full
//!
//! [probe]
//! interval_ms = 1000
//! count = 10
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default maximum map size when `m` is given without a size
pub const DEFAULT_MAP_SIZE: usize = 100;

/// Upper bound for the first allocation of a map
pub const DEFAULT_INITIAL_MAX: usize = 512;

/// Growth step applied each time a map fills up
pub const DEFAULT_MAP_EXTENSION: usize = 512;

/// Ping map sizing
///
/// # Example
/// ```
/// use pingexit::config::MapConfig;
///
/// let config = MapConfig::new().with_initial_max(10).with_extension(3);
/// assert_eq!(config.initial_capacity(20), 10);
/// assert_eq!(config.initial_capacity(4), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Maximum map size used when `m` carries no size argument
    pub default_size: usize,

    /// Largest initial allocation; bigger maps start here and grow
    pub initial_max: usize,

    /// Number of slots added per growth step
    pub extension: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_MAP_SIZE,
            initial_max: DEFAULT_INITIAL_MAX,
            extension: DEFAULT_MAP_EXTENSION,
        }
    }
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_size(mut self, size: usize) -> Self {
        self.default_size = size;
        self
    }

    pub fn with_initial_max(mut self, size: usize) -> Self {
        self.initial_max = size;
        self
    }

    pub fn with_extension(mut self, size: usize) -> Self {
        self.extension = size;
        self
    }

    /// Capacity of a freshly created map bounded by `max_size`
    pub fn initial_capacity(&self, max_size: usize) -> usize {
        max_size.min(self.initial_max)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_size == 0 {
            bail!("map.default_size must be > 0");
        }
        if self.initial_max == 0 {
            bail!("map.initial_max must be > 0");
        }
        if self.extension == 0 {
            bail!("map.extension must be > 0");
        }
        Ok(())
    }
}

/// Probe driver defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Pause between rounds of a command probe (milliseconds)
    pub interval_ms: u64,

    /// Stop after this many rounds (None = until the condition is met)
    pub count: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            count: None,
        }
    }
}

/// Root configuration for pingexit.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingExitConfig {
    pub map: MapConfig,
    pub probe: ProbeConfig,
}

impl PingExitConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.map.validate()?;
        Ok(config)
    }
}
