use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_MIN_FRAME_SIZE: usize = 2 * 1024 * 1024;
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_FRAME_LEVEL: i32 = 6;
pub const DEFAULT_MIN_BATCH_FRAMES: usize = 10;
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Storage root layout settings.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding `raw/`, `processed/` and the catalog journal. Default: "storage".
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("storage")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// Frame sizing for newly written blobs.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Soft minimum; a frame closes on the first newline past this. Default: 2 MiB.
    #[serde(default = "default_min_frame_size")]
    pub min_frame_size: usize,
    /// Hard maximum; a frame closes here even without a newline. Default: 4 MiB.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    /// zstd level for each frame. Default: 6.
    #[serde(default = "default_frame_level")]
    pub level: i32,
}

fn default_min_frame_size() -> usize {
    DEFAULT_MIN_FRAME_SIZE
}
fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}
fn default_frame_level() -> i32 {
    DEFAULT_FRAME_LEVEL
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            min_frame_size: default_min_frame_size(),
            max_frame_size: default_max_frame_size(),
            level: default_frame_level(),
        }
    }
}

impl FrameConfig {
    /// Clamp inconsistent values instead of failing: max never drops below min, min is at least 1.
    pub fn normalized(self) -> Self {
        let min = self.min_frame_size.max(1);
        Self {
            min_frame_size: min,
            max_frame_size: self.max_frame_size.max(min),
            level: self.level,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ParseConfig {
    /// Frames a batch must hold before it may close. Default: 10.
    #[serde(default = "default_min_batch_frames")]
    pub min_batch_frames: usize,
    /// Upper bound on decode workers. Default: 8.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_min_batch_frames() -> usize {
    DEFAULT_MIN_BATCH_FRAMES
}
fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            min_batch_frames: default_min_batch_frames(),
            max_workers: default_max_workers(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DownloadConfig {
    /// Download worker threads. Default: 5.
    #[serde(default = "default_download_workers")]
    pub workers: usize,
    /// Read size between cancellation checks. Default: 8192.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// HTTP timeout in seconds. Default: 600.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_download_workers() -> usize {
    5
}
fn default_chunk_size() -> usize {
    8192
}
fn default_timeout_secs() -> u64 {
    600
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            workers: default_download_workers(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ProgressConfig {
    /// Subscriber wait before a heartbeat is emitted. Default: 30.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub frames: FrameConfig,
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

impl Settings {
    /// Load from `SENSORHUB_CONFIG` (default `config/sensorhub`) and `SENSORHUB__*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("SENSORHUB_CONFIG").unwrap_or_else(|_| "config/sensorhub".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("storage.root", "storage")?
            .set_default("frames.min_frame_size", DEFAULT_MIN_FRAME_SIZE as i64)?
            .set_default("frames.max_frame_size", DEFAULT_MAX_FRAME_SIZE as i64)?
            .set_default("frames.level", DEFAULT_FRAME_LEVEL as i64)?
            .set_default("parse.min_batch_frames", DEFAULT_MIN_BATCH_FRAMES as i64)?
            .set_default("parse.max_workers", DEFAULT_MAX_WORKERS as i64)?
            .set_default("download.workers", 5_i64)?
            .set_default("download.chunk_size", 8192_i64)?
            .set_default("download.timeout_secs", 600_i64)?
            .set_default("progress.heartbeat_secs", 30_i64)?
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("SENSORHUB").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
