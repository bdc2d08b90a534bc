//! Video stream metadata via ffprobe.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::Context;
use serde::Deserialize;

/// Per-stream info (subset of ffprobe `-show_streams`).
#[derive(Debug, Clone, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    /// "video" | "audio" | "subtitle" etc.
    #[serde(default)]
    pub codec_type: String,
    #[serde(default)]
    pub codec_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30000/1001"
    #[serde(default)]
    pub r_frame_rate: String,
    #[serde(default)]
    pub avg_frame_rate: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<StreamInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

/// Parses an ffprobe rational such as "24000/1001" or "25".
pub fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

pub fn parse_probe_output(json: &str) -> anyhow::Result<VideoInfo> {
    let output: ProbeOutput = serde_json::from_str(json).context("invalid ffprobe output")?;
    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| anyhow::anyhow!("no video stream found"))?;

    let width = stream.width.filter(|w| *w > 0);
    let height = stream.height.filter(|h| *h > 0);
    let (Some(width), Some(height)) = (width, height) else {
        anyhow::bail!("video stream {} has no frame size", stream.index);
    };
    let frame_rate = parse_rate(&stream.r_frame_rate)
        .or_else(|| parse_rate(&stream.avg_frame_rate))
        .ok_or_else(|| anyhow::anyhow!("video stream {} has no frame rate", stream.index))?;

    log::debug!(
        "probed stream {}: {} {}x{} @ {:.3} fps",
        stream.index,
        stream.codec_name,
        width,
        height,
        frame_rate
    );
    Ok(VideoInfo {
        width,
        height,
        frame_rate,
    })
}

pub fn probe_video(ffprobe: &Path, input: &Path) -> anyhow::Result<VideoInfo> {
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {}", ffprobe.display()))?;
    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            ffprobe.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("30"), Some(30.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.001);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate(""), None);
    }

    #[test]
    fn test_parse_probe_output_picks_video_stream() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "codec_name": "aac", "r_frame_rate": "0/0"},
                {"index": 1, "codec_type": "video", "codec_name": "h264",
                 "width": 1280, "height": 720, "r_frame_rate": "0/0", "avg_frame_rate": "24/1"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(
            info,
            VideoInfo {
                width: 1280,
                height: 720,
                frame_rate: 24.0
            }
        );
    }

    #[test]
    fn test_parse_probe_output_without_video() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "audio"}]}"#;
        assert!(parse_probe_output(json).is_err());
        assert!(parse_probe_output("{}").is_err());
    }
}
