//! Turns the raw rgb24 output of an ffmpeg process into paired frames on a
//! work queue.
//!
//! Data Flow:
//! ```text
//! ffmpeg stdout ──► Deframer ──► FramePairer ──► WorkSink ──► consumers
//!                  (fixed-size     (previous,       (index, pair,
//!                   chunks)         current)         settings)
//! ```

pub mod command;
pub mod config;
pub mod decoder;
pub mod deframer;
pub mod error;
pub mod frame;
pub mod log_level;
pub mod pairer;
pub mod process;
pub mod queue;

pub use config::DecoderConfig;
pub use decoder::{DecodeOutcome, DecoderState, DecoderThread, StopHandle, VideoDecoder};
pub use error::{DecodeError, Result};
pub use frame::{Frame, FrameGeometry, FrameLimits, FramePair};
pub use log_level::{FfmpegLogLevel, HostLogLevel};
pub use queue::{WorkItem, WorkQueue, WorkSink};
