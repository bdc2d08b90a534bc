use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{DecodeError, Result},
    frame::{FrameGeometry, FrameLimits},
    log_level::HostLogLevel,
};

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ignore_max_image_pixels() -> bool {
    true
}

/// Everything needed to launch one decode session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub input_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Output frames per second requested from ffmpeg.
    pub frame_rate: f64,
    #[serde(default)]
    pub log_level: HostLogLevel,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ignore_max_image_pixels")]
    pub ignore_max_image_pixels: bool,
}

impl DecoderConfig {
    pub fn new(input_path: impl AsRef<Path>, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            input_path: input_path.as_ref().to_path_buf(),
            width,
            height,
            frame_rate,
            log_level: HostLogLevel::default(),
            ffmpeg_path: default_ffmpeg_path(),
            ignore_max_image_pixels: default_ignore_max_image_pixels(),
        }
    }

    pub fn with_log_level(mut self, log_level: HostLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_ffmpeg_path(mut self, ffmpeg_path: impl AsRef<Path>) -> Self {
        self.ffmpeg_path = ffmpeg_path.as_ref().to_path_buf();
        self
    }

    pub fn with_ignore_max_image_pixels(mut self, ignore: bool) -> Self {
        self.ignore_max_image_pixels = ignore;
        self
    }

    pub fn geometry(&self) -> Result<FrameGeometry> {
        FrameGeometry::new(self.width, self.height)
    }

    pub fn limits(&self) -> FrameLimits {
        FrameLimits::from_ignore_flag(self.ignore_max_image_pixels)
    }

    pub fn validate(&self) -> Result<()> {
        self.geometry()?;
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(DecodeError::InvalidConfig(format!(
                "invalid frame rate {}",
                self.frame_rate
            )));
        }
        if self.input_path.as_os_str().is_empty() {
            return Err(DecodeError::InvalidConfig("input path is empty".to_string()));
        }
        Ok(())
    }
}
