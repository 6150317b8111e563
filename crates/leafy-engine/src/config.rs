//! Engine configuration.
//!
//! Run length, view size, the scripted walk seed and the chunk registry
//! tunables. Configuration can be loaded from and saved to a TOML file.

use leafy_world::RegistryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "leafy.toml";

/// Environment variable overriding the configuration file path.
const CONFIG_ENV: &str = "LEAFY_CONFIG";

/// Largest accepted view extent in chunks.
const MAX_VIEW_CHUNKS: i32 = 64;

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Run Settings ===
    /// Number of ticks to run before shutting down
    pub ticks: u32,
    /// Ticks between residency summaries (0 = never)
    pub log_summary_every: u32,

    // === View Settings ===
    /// Visible width in chunks
    pub view_width: i32,
    /// Visible height in chunks
    pub view_height: i32,

    // === Walk Settings ===
    /// Seed for the scripted viewpoint walk
    pub seed: u64,

    /// Chunk registry settings
    pub registry: RegistryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ticks: 600,
            log_summary_every: 60,
            view_width: 8,
            view_height: 6,
            seed: 0x1eaf,
            registry: RegistryConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `LEAFY_CONFIG`, or `leafy.toml` in the
    /// working directory. Returns default config if the file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the configuration file path.
    fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.registry.validate();
        self.view_width = self.view_width.clamp(1, MAX_VIEW_CHUNKS);
        self.view_height = self.view_height.clamp(1, MAX_VIEW_CHUNKS);
    }
}
