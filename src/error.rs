/// Result alias that carries the crate's [`OsciError`] type.
pub type Result<T> = std::result::Result<T, OsciError>;

/// Errors surfaced by the rendering pipeline.
///
/// Most runtime failures are recoverable: the pipeline reports them and keeps
/// playing on whatever device and frame it already has. Only a missing output
/// device at startup is fatal.
#[derive(Debug, thiserror::Error)]
pub enum OsciError {
    /// The host exposes no output device at all.
    #[error("no audio output device available")]
    NoDevice,
    /// A device was requested by name but the host does not know it.
    #[error("audio device `{0}` not found")]
    DeviceNotFound(String),
    /// The backend failed to open, configure or start a stream.
    #[error("audio device error: {0}")]
    Device(String),
    /// A frame source could not produce a frame.
    #[error("frame source error: {0}")]
    Source(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A lock guarding shared state was poisoned by a panicking thread.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// A bounded control queue had no room for a message.
    #[error("{0} queue is full")]
    QueueFull(&'static str),
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

impl OsciError {
    pub fn device<E: std::fmt::Display>(err: E) -> Self {
        Self::Device(err.to_string())
    }

    pub fn source<E: std::fmt::Display>(err: E) -> Self {
        Self::Source(err.to_string())
    }
}
