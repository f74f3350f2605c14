//! Configuration management (ghostreel.toml)
//!
//! Handles loading, saving, and providing defaults for replay settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::replay::runtime::{PlayerConfig, RecorderConfig};

/// File name of the settings file inside the config directory
pub const CONFIG_FILE: &str = "ghostreel.toml";

/// Replay directory relative to the configuration root
pub const REPLAY_SUBDIR: [&str; 2] = ["cameraTools", "replays"];

/// Replay configuration.
///
/// Serialized to/from TOML format for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplayConfig {
    /// Where replays are stored
    #[serde(default)]
    pub storage: StorageConfig,
    /// Playback controls
    #[serde(default)]
    pub playback: PlaybackConfig,
    /// Recording settings
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Storage location settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Overrides the configuration root (default: platform config directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Speed change per timeline +/- press (default: 0.25)
    #[serde(default = "default_speed_step")]
    pub speed_step: f32,
    /// Play placement/destruction effects on world ghosts (default: true)
    #[serde(default = "default_true")]
    pub play_effects: bool,
}

/// Recording settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Record structural world changes (default: true)
    #[serde(default = "default_true")]
    pub world_state: bool,
}

fn default_true() -> bool {
    true
}
fn default_speed_step() -> f32 {
    0.25
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed_step: default_speed_step(),
            play_effects: default_true(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            world_state: default_true(),
        }
    }
}

impl ReplayConfig {
    /// Configuration root: the override if set, else the platform directory
    pub fn root(&self) -> Option<PathBuf> {
        self.storage.root.clone().or_else(config_dir)
    }

    /// Directory holding `.valreplay` files (`<root>/cameraTools/replays`)
    pub fn replay_dir(&self) -> Option<PathBuf> {
        self.root()
            .map(|root| REPLAY_SUBDIR.iter().fold(root, |dir, part| dir.join(part)))
    }

    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            world_state: self.capture.world_state,
        }
    }

    pub fn player(&self) -> PlayerConfig {
        PlayerConfig {
            play_effects: self.playback.play_effects,
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\ghostreel\config`
/// On macOS: `~/Library/Application Support/io.ghostreel.ghostreel`
/// On Linux: `~/.config/ghostreel`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "ghostreel", "ghostreel")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Reads `ghostreel.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> ReplayConfig {
    let Some(path) = config_dir().map(|dir| dir.join(CONFIG_FILE)) else {
        return ReplayConfig::default();
    };
    let Ok(content) = std::fs::read_to_string(&path) else {
        return ReplayConfig::default();
    };
    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            ReplayConfig::default()
        }
    }
}

/// Saves the configuration to disk.
///
/// Writes `ghostreel.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &ReplayConfig) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        std::fs::create_dir_all(&dir)?;
        let content = toml::to_string_pretty(config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(dir.join(CONFIG_FILE), content)?;
    }
    Ok(())
}
