use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Caption segmentation and timing
    #[serde(default)]
    pub captions: CaptionConfig,

    /// Text-to-speech service
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Remote rendering service
    #[serde(default)]
    pub render: RenderConfig,

    /// Local ffmpeg pipeline
    #[serde(default)]
    pub local: LocalVideoConfig,

    /// Where generated files go
    #[serde(default)]
    pub output: OutputConfig,

    /// Static media server
    #[serde(default)]
    pub server: ServerConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Caption segmentation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CaptionConfig {
    /// Maximum caption length in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Narration language (ISO 639-1 code passed to the TTS service)
    #[serde(default = "default_language")]
    pub language: String,

    /// Duration lookups allowed in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-caption duration lookup timeout; 0 disables it
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            language: default_language(),
            concurrency: default_concurrency(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

/// Text-to-speech service settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    // @field: TTS endpoint URL
    #[serde(default = "default_speech_endpoint")]
    pub endpoint: String,

    // @field: Request timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: User-Agent header sent with TTS requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: default_speech_endpoint(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Remote rendering service settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RenderConfig {
    /// Renders endpoint URL
    #[serde(default = "default_render_endpoint")]
    pub endpoint: String,

    /// API key sent as a Bearer token
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Seconds between status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up waiting for a render after this many seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Output container (e.g. "mp4")
    #[serde(default = "default_output_format")]
    pub output_format: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Public base URL under which the static server exposes local media.
    /// When empty, local paths are passed to the renderer unchanged.
    #[serde(default)]
    pub media_base_url: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_render_endpoint(),
            api_key: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            output_format: default_output_format(),
            frame_rate: default_frame_rate(),
            width: default_width(),
            height: default_height(),
            media_base_url: None,
        }
    }
}

/// Local ffmpeg pipeline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocalVideoConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// x264 preset
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Audio bitrate (e.g. "192k")
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// ffmpeg/ffprobe timeout in seconds
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LocalVideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            preset: default_preset(),
            audio_bitrate: default_audio_bitrate(),
            timeout_secs: default_media_timeout_secs(),
        }
    }
}

/// Output locations
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory for JSON, SRT and video output
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for synthesized narration clips
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            audio_dir: default_audio_dir(),
        }
    }
}

/// Static media server settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served at `/`
    #[serde(default = "default_server_root")]
    pub root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root: default_server_root(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_max_length() -> usize {
    20
}

fn default_language() -> String {
    "ko".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_oracle_timeout_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_speech_endpoint() -> String {
    "https://translate.google.com/translate_tts".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string()
}

fn default_render_endpoint() -> String {
    "https://api.creatomate.com/v1/renders".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_poll_timeout_secs() -> u64 {
    900
}

fn default_output_format() -> String {
    "mp4".to_string()
}

fn default_frame_rate() -> u32 {
    60
}

fn default_width() -> u32 {
    720
}

fn default_height() -> u32 {
    1280
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_media_timeout_secs() -> u64 {
    600
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio")
}

fn default_port() -> u16 {
    8000
}

fn default_server_root() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.captions.max_length == 0 {
            return Err(anyhow!("captions.max_length must be greater than zero"));
        }

        crate::language_utils::validate_tts_language(&self.captions.language)?;

        if self.speech.endpoint.trim().is_empty() {
            return Err(anyhow!("speech.endpoint must not be empty"));
        }

        if self.render.endpoint.trim().is_empty() {
            return Err(anyhow!("render.endpoint must not be empty"));
        }

        if self.render.poll_interval_secs == 0 {
            return Err(anyhow!("render.poll_interval_secs must be greater than zero"));
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(anyhow!(
                "render.width and render.height must be positive (got {}x{})",
                self.render.width,
                self.render.height
            ));
        }

        Ok(())
    }

    /// Per-call oracle timeout, if enabled
    pub fn oracle_timeout(&self) -> Option<std::time::Duration> {
        match self.captions.oracle_timeout_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            captions: CaptionConfig::default(),
            speech: SpeechConfig::default(),
            render: RenderConfig::default(),
            local: LocalVideoConfig::default(),
            output: OutputConfig::default(),
            server: ServerConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
