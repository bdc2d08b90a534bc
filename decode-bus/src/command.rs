use std::{
    ffi::OsString,
    fmt::{Display, Formatter},
    path::PathBuf,
    process::{Command, Stdio},
};

use crate::{config::DecoderConfig, log_level::FfmpegLogLevel};

/// ffmpeg invocation that writes bare rgb24 frames of the input's video
/// stream to stdout.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeCommand {
    program: PathBuf,
    input: PathBuf,
    frame_rate: f64,
    log_level: FfmpegLogLevel,
}

impl DecodeCommand {
    pub fn new(program: impl Into<PathBuf>, input: impl Into<PathBuf>, frame_rate: f64) -> Self {
        Self {
            program: program.into(),
            input: input.into(),
            frame_rate,
            log_level: FfmpegLogLevel::Info,
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(&config.ffmpeg_path, &config.input_path, config.frame_rate)
            .log_level(config.log_level.into())
    }

    pub fn log_level(mut self, log_level: FfmpegLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-nostats",
            "-loglevel",
            self.log_level.as_str(),
            "-r",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(self.frame_rate.to_string().into());
        args.push("-i".into());
        args.push(self.input.clone().into_os_string());
        args.extend(
            [
                "-map", "0:v", "-f", "rawvideo", "-pix_fmt", "rgb24", "-vsync", "1", "-y",
                "pipe:1",
            ]
            .iter()
            .map(OsString::from),
        );
        args
    }

    /// Builds the process command: stdout piped, stdin closed, stderr inherited.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }
}

impl Display for DecodeCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in self.args() {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
