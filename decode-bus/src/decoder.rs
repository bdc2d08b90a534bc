use std::{
    fmt::{Display, Formatter},
    io,
    process::ExitStatus,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread::JoinHandle,
};

use tokio_util::sync::CancellationToken;

use crate::{
    command::DecodeCommand,
    config::DecoderConfig,
    deframer::Deframer,
    error::{DecodeError, Result},
    frame::{FrameGeometry, FrameLimits, LimitCheck},
    pairer::FramePairer,
    process::DecodeProcess,
    queue::{WorkItem, WorkSink},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DecoderState {
    Created = 0,
    Running = 1,
    /// The stream ended cleanly.
    Depleted = 2,
    /// A stop request was observed.
    Stopped = 3,
    Failed = 4,
    /// The process has been reaped.
    Exited = 5,
}

impl DecoderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DecoderState::Created,
            1 => DecoderState::Running,
            2 => DecoderState::Depleted,
            3 => DecoderState::Stopped,
            4 => DecoderState::Failed,
            _ => DecoderState::Exited,
        }
    }
}

impl Display for DecoderState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DecoderState::Created => "created",
            DecoderState::Running => "running",
            DecoderState::Depleted => "depleted",
            DecoderState::Stopped => "stopped",
            DecoderState::Failed => "failed",
            DecoderState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// State shared with the owner thread. Only moves forward.
#[derive(Clone, Debug)]
struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(DecoderState::Created as u8)))
    }

    fn get(&self) -> DecoderState {
        DecoderState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn advance(&self, next: DecoderState) {
        self.0.fetch_max(next as u8, Ordering::AcqRel);
    }
}

/// Marks the decoder `Failed` if the loop unwinds.
struct PanicGuard(StateCell);

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.advance(DecoderState::Failed);
        }
    }
}

/// Cloneable handle that asks a running decoder to stop.
#[derive(Clone, Debug)]
pub struct StopHandle {
    cancel: CancellationToken,
}

impl StopHandle {
    /// Cooperative: the loop finishes the read or enqueue in flight first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of one decode session, available once the loop has exited.
#[derive(Debug)]
pub struct DecodeOutcome {
    /// Depleted, Stopped or Failed.
    pub state: DecoderState,
    pub frames_read: u64,
    pub items_enqueued: u64,
    pub error: Option<DecodeError>,
    pub exit_status: Option<ExitStatus>,
}

impl DecodeOutcome {
    pub fn last_error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }

    fn panicked(message: String) -> Self {
        Self {
            state: DecoderState::Failed,
            frames_read: 0,
            items_enqueued: 0,
            error: Some(DecodeError::Panicked(message)),
            exit_status: None,
        }
    }
}

/// Reads raw frames from a decode process, pairs them and feeds a work queue.
///
/// Construct with [`VideoDecoder::start`], then drive it with
/// [`run`](VideoDecoder::run) on a thread of your choice, [`spawn`](VideoDecoder::spawn)
/// or [`run_async`](VideoDecoder::run_async). A decoder runs once.
pub struct VideoDecoder<Q, S> {
    process: DecodeProcess,
    geometry: FrameGeometry,
    limits: FrameLimits,
    queue: Q,
    settings: S,
    cancel: CancellationToken,
    state: StateCell,
}

impl<Q, S> VideoDecoder<Q, S>
where
    Q: WorkSink<S>,
    S: Clone + Send,
{
    /// Launches ffmpeg for `config`. Fails without starting anything if the
    /// config is invalid or the binary cannot be executed.
    pub fn start(config: &DecoderConfig, queue: Q, settings: S) -> Result<Self> {
        config.validate()?;
        let command = DecodeCommand::from_config(config);
        log::info!("starting decoder: {}", command);
        let process = DecodeProcess::spawn(command.to_command())?;
        Ok(Self::from_process(
            process,
            config.geometry()?,
            config.limits(),
            queue,
            settings,
        ))
    }

    /// Wraps an already running process that writes rgb24 frames of
    /// `geometry` to stdout.
    pub fn from_process(
        process: DecodeProcess,
        geometry: FrameGeometry,
        limits: FrameLimits,
        queue: Q,
        settings: S,
    ) -> Self {
        Self {
            process,
            geometry,
            limits,
            queue,
            settings,
            cancel: CancellationToken::new(),
            state: StateCell::new(),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn process_id(&self) -> u32 {
        self.process.id()
    }

    pub fn state(&self) -> DecoderState {
        self.state.get()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            cancel: self.cancel.clone(),
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Runs the decode loop on the current thread until the stream is
    /// depleted, a stop is requested or an error occurs. The process is
    /// always reaped before this returns.
    pub fn run(mut self) -> DecodeOutcome {
        let _guard = PanicGuard(self.state.clone());
        self.state.advance(DecoderState::Running);
        let mut pairer = FramePairer::new();
        let mut items_enqueued = 0u64;
        let mut frames_read = 0u64;

        let (state, error) = match self.process.take_stdout() {
            Some(stdout) => {
                let mut deframer = Deframer::new(stdout, self.geometry);
                let result = self.decode_loop(&mut deframer, &mut pairer, &mut items_enqueued);
                frames_read = deframer.frames_read();
                match result {
                    Ok(state) => (state, None),
                    Err(e) => (DecoderState::Failed, Some(e)),
                }
            }
            None => (
                DecoderState::Failed,
                Some(DecodeError::StreamRead(io::Error::other(
                    "decoder output already taken",
                ))),
            ),
        };

        match (&state, &error) {
            (_, Some(e)) => log::error!(
                "decoder {} failed after {} frames: {}",
                self.process.program(),
                frames_read,
                e
            ),
            (DecoderState::Stopped, None) => {
                log::debug!("decoder stopped after {} frames", frames_read)
            }
            _ => log::debug!("decoding queue depleted after {} frames", frames_read),
        }
        self.state.advance(state);

        let exit_status = match self.process.reap() {
            Ok(status) => {
                if status.success() || state == DecoderState::Stopped {
                    log::debug!("{} exited: {}", self.process.program(), status);
                } else {
                    log::warn!("{} exited: {}", self.process.program(), status);
                }
                Some(status)
            }
            Err(e) => {
                log::error!("failed to wait for {}: {}", self.process.program(), e);
                None
            }
        };
        self.state.advance(DecoderState::Exited);
        log::debug!("decoder thread exiting");

        DecodeOutcome {
            state,
            frames_read,
            items_enqueued,
            error,
            exit_status,
        }
    }

    fn decode_loop<R: io::Read>(
        &self,
        deframer: &mut Deframer<R>,
        pairer: &mut FramePairer,
        items_enqueued: &mut u64,
    ) -> Result<DecoderState> {
        if self.limits.check(self.geometry)? == LimitCheck::Oversized {
            log::warn!(
                "frame size {} exceeds {} pixels",
                self.geometry,
                self.limits.max_pixels().unwrap_or_default()
            );
        }

        loop {
            if self.cancel.is_cancelled() {
                return Ok(DecoderState::Stopped);
            }
            let Some(frame) = deframer.read_frame()? else {
                return Ok(DecoderState::Depleted);
            };
            if let Some((index, frames)) = pairer.push(frame) {
                self.queue
                    .enqueue(WorkItem::new(index, frames, self.settings.clone()))?;
                *items_enqueued += 1;
            }
        }
    }

    /// Runs the loop on a dedicated thread.
    pub fn spawn(self) -> io::Result<DecoderThread>
    where
        Q: 'static,
        S: 'static,
    {
        let stop = self.stop_handle();
        let state = self.state.clone();
        let process_id = self.process_id();
        let handle = std::thread::Builder::new()
            .name(format!("video-decoder-{}", process_id))
            .spawn(move || self.run())?;
        Ok(DecoderThread {
            handle,
            stop,
            state,
            process_id,
        })
    }

    /// Runs the loop on tokio's blocking pool and waits for it.
    pub async fn run_async(self) -> DecodeOutcome
    where
        Q: 'static,
        S: 'static,
    {
        match tokio::task::spawn_blocking(move || self.run()).await {
            Ok(outcome) => outcome,
            Err(e) => DecodeOutcome::panicked(e.to_string()),
        }
    }
}

/// Owner side of a decoder running on its own thread.
pub struct DecoderThread {
    handle: JoinHandle<DecodeOutcome>,
    stop: StopHandle,
    state: StateCell,
    process_id: u32,
}

impl DecoderThread {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> DecoderState {
        self.state.get()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Pid of the decode process, for callers that need to terminate it
    /// when a blocked read does not return in time.
    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    /// Waits for the loop to exit and returns its outcome.
    pub fn join(self) -> DecodeOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                DecodeOutcome::panicked(message)
            }
        }
    }
}

#[cfg(test)]
#[path = "decoder_test.rs"]
mod decoder_test;
