use std::path::PathBuf;

use clap::Parser;

/// Decode a video into paired rgb24 frames and feed them to a work queue.
#[derive(Parser, Debug)]
#[command(name = "frame-pipe", version)]
pub struct Args {
    /// Input file or URL understood by ffmpeg
    pub input: PathBuf,

    /// Frame width in pixels (probed when omitted)
    #[arg(long)]
    pub width: Option<u32>,

    /// Frame height in pixels (probed when omitted)
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate (probed when omitted)
    #[arg(long = "fps")]
    pub frame_rate: Option<f64>,

    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    #[arg(long, default_value = "ffprobe")]
    pub ffprobe: PathBuf,

    /// Maximum number of frame pairs waiting for the consumer
    #[arg(long, default_value_t = 32)]
    pub queue_capacity: usize,

    /// JSON file passed through to consumers as processing settings
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write the current frame of every pair as PPM into this directory
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// Reject frames larger than the default image size limit
    #[arg(long)]
    pub enforce_image_limits: bool,

    #[arg(long, default_value = "info")]
    pub log_level: log::LevelFilter,
}
