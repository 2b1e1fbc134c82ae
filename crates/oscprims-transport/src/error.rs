/// Errors that can occur in UDP transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote host could not be resolved to a socket address.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        source: std::io::Error,
    },

    /// The OS refused to create or bind the socket. The transport is unusable.
    #[error("failed to create socket: {0}")]
    Socket(std::io::Error),

    /// A single datagram could not be transmitted.
    #[error("failed to send datagram: {0}")]
    Send(std::io::Error),

    /// Waiting for socket readiness failed.
    #[error("failed to poll socket: {0}")]
    Poll(std::io::Error),

    /// Reading a ready datagram failed.
    #[error("failed to receive datagram: {0}")]
    Recv(std::io::Error),

    /// The datagram exceeds what UDP can carry.
    #[error("datagram too large ({len} bytes, max {max})")]
    DatagramTooLarge { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, TransportError>;
