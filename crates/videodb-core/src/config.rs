//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_RANK__TOP_K=5`). Path settings go through [`expand_path`] for `~` and
//! `${VAR}` expansion.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::Modality;

pub struct Config {
    figment: Figment,
    settings: Settings,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self::from_figment(figment)?)
    }

    /// Builds a config from an already assembled figment (tests, embedding hosts).
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        settings.validate()?;
        Ok(Self { figment, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory that receives index artifacts; must not exist before indexing.
    pub workspace: String,
    pub data_dir: String,
    pub segment: SegmentSettings,
    pub filter: FilterSettings,
    pub rank: RankSettings,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: "./workspace".to_string(),
            data_dir: "./toy-data".to_string(),
            segment: SegmentSettings::default(),
            filter: FilterSettings::default(),
            rank: RankSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let audio = &self.segment.audio;
        if !(audio.chunk_duration > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "segment.audio.chunk_duration must be positive, got {}",
                audio.chunk_duration
            )));
        }
        if !(audio.chunk_stride > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "segment.audio.chunk_stride must be positive, got {}",
                audio.chunk_stride
            )));
        }
        self.segment.frames.validate()?;
        if self.rank.metric.trim().is_empty() {
            return Err(Error::InvalidConfiguration("rank.metric must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentSettings {
    pub audio: AudioSettings,
    pub frames: FrameSettings,
}

/// Sliding-window parameters, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub chunk_duration: f64,
    pub chunk_stride: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self { chunk_duration: 10.0, chunk_stride: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSampling {
    /// Fixed rate, frames per second.
    Fps(f64),
    KeyframesOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub fps: f64,
    pub keyframes_only: bool,
    pub max_num_frames: usize,
    pub width: u32,
    pub height: u32,
    /// Keep the per-document scratch directory after harvesting frames.
    pub retain_temp: bool,
    pub ffmpeg: String,
    pub timeout_secs: u64,
    pub audio_sample_rate: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            fps: 1.0,
            keyframes_only: false,
            max_num_frames: 50,
            width: 224,
            height: 224,
            retain_temp: false,
            ffmpeg: "ffmpeg".to_string(),
            timeout_secs: 120,
            audio_sample_rate: 16_000,
        }
    }
}

impl FrameSettings {
    pub fn sampling(&self) -> FrameSampling {
        if self.keyframes_only { FrameSampling::KeyframesOnly } else { FrameSampling::Fps(self.fps) }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution { width: self.width, height: self.height }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.keyframes_only && !(self.fps > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "segment.frames.fps must be positive, got {}",
                self.fps
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "segment.frames resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfiguration("segment.frames.timeout_secs must be positive".into()));
        }
        if self.audio_sample_rate == 0 {
            return Err(Error::InvalidConfiguration("segment.frames.audio_sample_rate must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// When unset the filter passes documents through untouched.
    pub modality: Option<Modality>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankSettings {
    pub metric: String,
    /// One of `min`, `max`, `mean_min`, `mean_max`; parsed by the ranker.
    pub policy: String,
    pub top_k: usize,
    pub modalities: Vec<Modality>,
}

impl Default for RankSettings {
    fn default() -> Self {
        Self {
            metric: "cosine".to_string(),
            policy: "min".to_string(),
            top_k: 10,
            modalities: vec![Modality::Image, Modality::Audio],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Per-target overrides, e.g. `videodb_segment = "debug"`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), modules: BTreeMap::new() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
