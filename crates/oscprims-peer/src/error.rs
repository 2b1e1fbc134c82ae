use crate::handshake::ConnectOutcome;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] oscprims_transport::TransportError),

    /// Encode or decode error.
    #[error("frame error: {0}")]
    Frame(#[from] oscprims_frame::FrameError),

    /// The connection has no live socket. Call `connect` first.
    #[error("not connected")]
    NotConnected,

    /// The liveness probe did not confirm the console.
    #[error("handshake failed: {outcome} ({detail})")]
    Handshake {
        outcome: ConnectOutcome,
        detail: String,
    },

    /// The console answered with a different argument type than requested.
    #[error("{address}: expected {expected} reply, got {found}")]
    UnexpectedType {
        address: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Connection configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PeerError>;
