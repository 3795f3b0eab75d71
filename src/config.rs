use crate::defaults;
use crate::error::{Result, TalkbackError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognizer: RecognizerConfig,
    pub storage: StorageConfig,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Directory holding the unpacked recognition model.
    pub model_path: Option<PathBuf>,
    /// Bytes fed to the recognizer per chunk. Must be a multiple of the
    /// 16-bit sample size.
    pub chunk_bytes: usize,
}

/// Recording storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Where recordings land; defaults to the user data directory.
    pub recording_path: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            chunk_bytes: defaults::RECOGNIZER_CHUNK_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; invalid TOML is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TalkbackError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                TalkbackError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or fall back to defaults when the
    /// file does not exist. Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(TalkbackError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - TALKBACK_MODEL → recognizer.model_path
    /// - TALKBACK_INPUT_DEVICE → audio.input_device
    /// - TALKBACK_OUTPUT_DEVICE → audio.output_device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("TALKBACK_MODEL")
            && !model.is_empty()
        {
            self.recognizer.model_path = Some(PathBuf::from(model));
        }

        if let Ok(device) = std::env::var("TALKBACK_INPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.input_device = Some(device);
        }

        if let Ok(device) = std::env::var("TALKBACK_OUTPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.output_device = Some(device);
        }

        self
    }

    fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(TalkbackError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.recognizer.chunk_bytes == 0 || self.recognizer.chunk_bytes % 2 != 0 {
            return Err(TalkbackError::ConfigInvalidValue {
                key: "recognizer.chunk_bytes".to_string(),
                message: "must be a positive multiple of 2".to_string(),
            });
        }
        Ok(())
    }

    /// Resolved recording file path: the configured one, or
    /// `<data dir>/talkback/recording.wav`.
    pub fn recording_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.recording_path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talkback")
            .join(defaults::RECORDING_FILE_NAME)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/talkback/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("talkback")
            .join("config.toml")
    }
}
