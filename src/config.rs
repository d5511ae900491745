use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Seconds skipped by the arrow-key / j / l shortcuts.
    #[serde(default = "default_seek_step")]
    pub seek_step_seconds: u64,

    /// Volume applied when a media file is opened, in [0.0, 1.0].
    #[serde(default = "default_volume")]
    pub initial_volume: f64,
}

fn default_seek_step() -> u64 {
    5
}

fn default_volume() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_step_seconds: default_seek_step(),
            initial_volume: default_volume(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            debug!("Loading config from {:?}", config_path);
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        self.save_to(&config_path)?;
        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("marquee").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_on_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.playback.seek_step_seconds, 5);
        assert_eq!(config.playback.initial_volume, 1.0);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[playback]\nseek_step_seconds = 10\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.playback.seek_step_seconds, 10);
        assert_eq!(config.playback.initial_volume, 1.0);
    }

    #[test]
    fn roundtrips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.playback.seek_step_seconds = 15;
        config.playback.initial_volume = 0.25;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.playback.seek_step_seconds, 15);
        assert_eq!(loaded.playback.initial_volume, 0.25);
    }
}
