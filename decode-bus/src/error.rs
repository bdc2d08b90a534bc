use thiserror::Error;

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Error, Debug)]
pub enum DecodeError {
    /// The decode process could not be started at all.
    #[error("failed to launch {program}: {source}")]
    ProcessLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid decoder config: {0}")]
    InvalidConfig(String),

    /// The stream ended in the middle of a frame.
    #[error("not enough image data: expected {expected} bytes, stream ended after {received}")]
    InsufficientFrameData { expected: usize, received: usize },

    #[error("failed to read decoder output: {0}")]
    StreamRead(#[from] std::io::Error),

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("work queue closed by all consumers")]
    QueueClosed,

    #[error("decoder thread panicked: {0}")]
    Panicked(String),
}

impl DecodeError {
    pub(crate) fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::ProcessLaunch {
            program: program.into(),
            source,
        }
    }
}
