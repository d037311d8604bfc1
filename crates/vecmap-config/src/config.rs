//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub assets: AssetsConfig,
    pub lod: LodSettings,
    pub loader: LoaderConfig,
    pub view: ViewConfig,
    pub debug: DebugConfig,
}

/// Where tile files live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory searched recursively for `tri_*.tri` files.
    pub tile_dir: PathBuf,
}

/// Level-of-detail blending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodSettings {
    /// Seconds for a tile to blend fully in or out.
    pub blend_duration_secs: f32,
    /// Frame gaps longer than this count as zero elapsed time.
    pub max_frame_delta_secs: f32,
}

/// Background tile loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    pub enabled: bool,
    pub thread_name: String,
}

/// Initial camera and viewport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Camera center in offset map units.
    pub center_x: f32,
    pub center_y: f32,
    /// Zoom scale factor; larger is more zoomed in.
    pub scale_factor: f32,
    /// Viewport size in pixels, used for the aspect ratio.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g. "info", "debug,vecmap_cache=trace").
    pub log_level: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            tile_dir: PathBuf::from("tiles"),
        }
    }
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            blend_duration_secs: 1.0 / 3.0,
            max_frame_delta_secs: 1.0,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thread_name: "tile-loader".to_string(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: -30000.0,
            scale_factor: 4096.0,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl ViewConfig {
    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Platform config directory for the viewer, e.g. `~/.config/vecmap`.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("vecmap"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-reads the file; `Some` only if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = std::fs::read_to_string(config_dir.join(CONFIG_FILE))
            .map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects values that parse but cannot drive the viewer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        };
        if !(self.lod.blend_duration_secs >= 0.0) {
            return invalid("lod.blend_duration_secs", "must be zero or positive");
        }
        if !(self.lod.max_frame_delta_secs > 0.0) {
            return invalid("lod.max_frame_delta_secs", "must be positive");
        }
        if !(self.view.scale_factor > 0.0) {
            return invalid("view.scale_factor", "must be positive");
        }
        if self.view.width == 0 || self.view.height == 0 {
            return invalid("view", "width and height must be nonzero");
        }
        if self.loader.thread_name.is_empty() {
            return invalid("loader.thread_name", "must not be empty");
        }
        Ok(())
    }
}
