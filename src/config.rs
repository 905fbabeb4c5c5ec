use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::visualizer::VisualizerMode;

/// Rejected configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fps must be greater than zero")]
    ZeroFps,
    #[error("chunk_size must be a power of two >= 64, got {0}")]
    ChunkSize(usize),
    #[error("sample_rate must be greater than zero")]
    ZeroSampleRate,
    #[error("smoothing_frames must be at least 1")]
    ZeroSmoothing,
    #[error("beat history must hold at least 1 frame")]
    ZeroHistory,
    #[error("beat threshold must be positive, got {0}")]
    BadThreshold(f32),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub audio: AudioConfig,
    pub beat: BeatConfig,
    pub visualizer: VisualizerConfig,
    pub ipc: IpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub start_mode: VisualizerMode,
    pub fps: u32,
    pub show_overlay: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            start_mode: VisualizerMode::Circular,
            fps: 60,
            show_overlay: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// PulseAudio source name (None = server default input)
    pub device: Option<String>,
    pub sample_rate: u32,
    /// Samples per captured frame, also the FFT size
    pub chunk_size: usize,
    /// Number of spectra averaged together
    pub smoothing_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            chunk_size: 2048,
            smoothing_frames: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BeatConfig {
    pub history: usize,
    pub threshold: f32,
    pub cooldown_frames: u32,
    pub bass_cutoff_hz: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            history: 20,
            threshold: 1.3,
            cooldown_frames: 10,
            bass_cutoff_hz: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisualizerConfig {
    /// Hue advance per analyzed frame (full cycle = 1.0)
    pub hue_step: f32,
    pub max_particles: usize,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            hue_step: 0.002,
            max_particles: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IpcConfig {
    pub enabled: bool,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Read and parse a config file. Values are checked by [`Config::validate`]
    /// once CLI overrides have been merged.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Get the default XDG config path (~/.config/micviz/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("micviz").join("config.toml"))
    }

    /// Load config from the default XDG path if it exists.
    /// Parse errors are logged and the defaults are used instead.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return None;
        }
        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("{:#}. Using defaults.", e);
                None
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        let chunk = self.audio.chunk_size;
        if chunk < 64 || !chunk.is_power_of_two() {
            return Err(ConfigError::ChunkSize(chunk));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if self.audio.smoothing_frames == 0 {
            return Err(ConfigError::ZeroSmoothing);
        }
        if self.beat.history == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        if self.beat.threshold.is_nan() || self.beat.threshold <= 0.0 {
            return Err(ConfigError::BadThreshold(self.beat.threshold));
        }
        Ok(())
    }

    /// Write the commented template to `path`, creating parent directories
    pub fn init_config_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::generate_config_template())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Initialize default config file at XDG path, returns the path
    pub fn init_default_config() -> Result<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::init_config_at(&path)?;
        Ok(path)
    }

    /// Store `mode` as `display.start_mode`, keeping the rest of the file
    /// (comments included) untouched. Creates the file from the template
    /// if it doesn't exist yet.
    pub fn persist_start_mode(path: &Path, mode: VisualizerMode) -> Result<()> {
        if !path.exists() {
            Self::init_config_at(path)?;
        }

        let content = std::fs::read_to_string(path)?;
        let mut doc = content
            .parse::<toml_edit::DocumentMut>()
            .with_context(|| format!("Failed to parse {} for saving", path.display()))?;

        if !doc.contains_key("display") {
            doc["display"] = toml_edit::table();
        }
        let display = doc
            .get_mut("display")
            .and_then(toml_edit::Item::as_table_like_mut)
            .ok_or_else(|| {
                anyhow::anyhow!("`display` in {} is not a table, mode not saved", path.display())
            })?;
        display.insert("start_mode", toml_edit::value(mode.key()));

        std::fs::write(path, doc.to_string())?;
        Ok(())
    }

    /// Generate a commented TOML config template
    pub fn generate_config_template() -> String {
        r#"# micviz configuration

[display]
# Mode shown at startup: circular, spectrum, waveform, radial, particles
start_mode = "circular"
# Target frames per second
fps = 60
# Show the "Mode N | FPS" line in the top-left corner
show_overlay = true

[audio]
# PulseAudio/PipeWire source (omit for the default input)
# device = "alsa_input.pci-0000_00_1f.3.analog-stereo"
# Sample rate in Hz
sample_rate = 44100
# Samples per frame, also the FFT size (power of two)
chunk_size = 2048
# Number of spectra averaged together
smoothing_frames = 3

[beat]
# Number of past frames in the bass energy average
history = 20
# A beat fires when bass energy exceeds average * threshold
threshold = 1.3
# Frames to ignore after a beat
cooldown_frames = 10
# Upper edge of the bass range in Hz
bass_cutoff_hz = 200.0

[visualizer]
# Hue advance per frame (1.0 = full color wheel)
hue_step = 0.002
# Upper bound on live particles in particle mode
max_particles = 4096

[ipc]
# Accept remote commands on $XDG_RUNTIME_DIR/micviz.sock
enabled = true
"#
        .to_string()
    }

    /// Merge CLI arguments into config (CLI takes priority)
    pub fn merge_args(&mut self, args: &crate::Args) {
        if let Some(mode) = args.mode {
            self.display.start_mode = mode;
        }
        if let Some(fps) = args.fps {
            self.display.fps = fps;
        }
        if let Some(ref device) = args.device {
            self.audio.device = Some(device.clone());
        }
        if let Some(threshold) = args.beat_threshold {
            self.beat.threshold = threshold;
        }
        if args.no_ipc {
            self.ipc.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("micviz-test-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(&Config::generate_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_takes_defaults() {
        let config: Config = toml::from_str("[beat]\nthreshold = 1.5\n").unwrap();
        assert_eq!(config.beat.threshold, 1.5);
        assert_eq!(config.beat.history, 20);
        assert_eq!(config.audio.chunk_size, 2048);
        assert_eq!(config.display.start_mode, VisualizerMode::Circular);
    }

    #[test]
    fn start_mode_accepts_name() {
        let config: Config = toml::from_str("[display]\nstart_mode = \"radial\"\n").unwrap();
        assert_eq!(config.display.start_mode, VisualizerMode::Radial);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        assert_eq!(config.validate(), Ok(()));

        config.audio.chunk_size = 1000;
        assert_eq!(config.validate(), Err(ConfigError::ChunkSize(1000)));

        config.audio.chunk_size = 1024;
        config.display.fps = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroFps));

        config.display.fps = 30;
        config.beat.threshold = f32::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::BadThreshold(_))));
    }

    #[test]
    fn persist_start_mode_keeps_comments() {
        let path = temp_config_path("persist");
        let _ = std::fs::remove_file(&path);

        Config::persist_start_mode(&path, VisualizerMode::Particles).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# micviz configuration"));
        assert!(content.contains("start_mode = \"particles\""));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.display.start_mode, VisualizerMode::Particles);
        assert_eq!(loaded.beat, BeatConfig::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn persist_refuses_non_table_display() {
        let path = temp_config_path("scalar-display");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "display = 5\n").unwrap();

        let err = Config::persist_start_mode(&path, VisualizerMode::Radial).unwrap_err();
        assert!(err.to_string().contains("not a table"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "display = 5\n");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn persist_into_inline_display_table() {
        let path = temp_config_path("inline-display");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "display = { fps = 30 }\n").unwrap();

        Config::persist_start_mode(&path, VisualizerMode::Spectrum).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.display.start_mode, VisualizerMode::Spectrum);
        assert_eq!(loaded.display.fps, 30);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn cli_overrides_apply_before_validation() {
        let path = temp_config_path("override");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[display]\nfps = 0\n").unwrap();

        let mut config = Config::load(&path).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::ZeroFps));

        let args = <crate::Args as clap::Parser>::parse_from(["micviz", "--fps", "30", "--no-ipc"]);
        config.merge_args(&args);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.display.fps, 30);
        assert!(!config.ipc.enabled);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
