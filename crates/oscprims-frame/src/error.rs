/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Caller-supplied message content cannot be encoded.
    ///
    /// Raised before any byte is written, so a failed encode never leaves a
    /// partial frame behind.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The received bytes do not form a well-formed message.
    #[error("malformed frame at byte {offset}: {reason}")]
    MalformedFrame { offset: usize, reason: String },

    /// The encoded frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An I/O error surfaced through the async datagram codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            offset,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
