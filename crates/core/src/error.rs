/// Result alias that carries the custom [`RigError`] type.
pub type Result<T> = std::result::Result<T, RigError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum RigError {
    /// A rhythm was handed to the engine while another one is still playing.
    #[error("playback engine is already playing a rhythm")]
    AlreadyPlaying,
    /// A bounded collection refused an append.
    #[error("{what} capacity of {capacity} exceeded")]
    CapacityExceeded { what: &'static str, capacity: usize },
    /// Catalog lookup on an empty catalog.
    #[error("no rhythm available")]
    NotFound,
    #[error("index {index} is out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },
    /// A pecker refused a strike because it is still cooling down.
    #[error("mechanism is busy and rejected the strike")]
    MechanismBusy,
    #[error("rhythm has no notes to play")]
    EmptyRhythm,
    /// Neither a bell nor a pecker is linked, so nothing could advance a
    /// rhythm.
    #[error("no bell or pecker mechanism is linked")]
    NoMechanisms,
    /// A shared collaborator is already borrowed by someone else.
    #[error("{0} is already borrowed")]
    Borrowed(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Fft(#[from] realfft::FftError),
}

impl RigError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn capacity(what: &'static str, capacity: usize) -> Self {
        Self::CapacityExceeded { what, capacity }
    }
}

impl From<&str> for RigError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for RigError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
