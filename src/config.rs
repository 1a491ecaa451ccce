use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::{EncodeSettings, FfmpegConfig, Looping, DEFAULT_FPS, DEFAULT_PALETTE_SIZE};

pub const CONFIG_FILE_NAME: &str = "vid2gif.json";

/// Optional defaults read from `vid2gif.json`. The file is never written.
///
/// ```json
/// { "width": 480, "fps": 15, "quality": 80, "speed": 1.0, "loop_forever": true,
///   "ffmpeg_path": "/usr/local/bin/ffmpeg" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub width: Option<u32>,
    pub fps: u32,
    pub quality: u32,
    pub speed: f64,
    pub loop_forever: bool,
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            width: None,
            fps: DEFAULT_FPS,
            quality: DEFAULT_PALETTE_SIZE,
            speed: 1.0,
            loop_forever: true,
            ffmpeg_path: None,
        }
    }
}

impl AppConfig {
    /// Config locations in lookup order: the user config dir, then the
    /// current directory.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::config_dir() {
            d.push("vid2gif");
            d.push(CONFIG_FILE_NAME);
            tried.push(d);
        }
        tried.push(PathBuf::from(CONFIG_FILE_NAME));
        tried
    }

    /// Load the first config file found, or built-in defaults if there is none.
    pub fn load() -> Result<Self> {
        for p in Self::candidate_paths() {
            if p.is_file() {
                return Self::from_file(&p);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: AppConfig = serde_json::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.settings().validate().map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(cfg)
    }

    pub fn settings(&self) -> EncodeSettings {
        EncodeSettings {
            width: self.width,
            fps: self.fps,
            quality: self.quality,
            looping: Looping::from_flag(!self.loop_forever),
            speed: self.speed,
        }
    }

    pub fn ffmpeg(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
        }
    }
}
