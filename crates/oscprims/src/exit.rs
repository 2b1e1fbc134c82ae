use std::fmt;
use std::io;

use oscprims_frame::FrameError;
use oscprims_peer::{ConnectOutcome, PeerError};
use oscprims_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Socket(source)
        | TransportError::Send(source)
        | TransportError::Poll(source)
        | TransportError::Recv(source)
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {source}"))
        }
        TransportError::DatagramTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::InvalidArgument(_) => CliError::new(USAGE, format!("{context}: {err}")),
        FrameError::MalformedFrame { .. } | FrameError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn peer_error(context: &str, err: PeerError) -> CliError {
    match err {
        PeerError::Transport(err) => transport_error(context, err),
        PeerError::Frame(err) => frame_error(context, err),
        PeerError::Handshake { outcome, .. } => {
            CliError::new(outcome_code(outcome), format!("{context}: {err}"))
        }
        PeerError::UnexpectedType { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        PeerError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        PeerError::NotConnected => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

/// Exit code for a connection outcome.
pub fn outcome_code(outcome: ConnectOutcome) -> i32 {
    match outcome {
        ConnectOutcome::Confirmed => SUCCESS,
        ConnectOutcome::TimedOut => TIMEOUT,
        ConnectOutcome::SocketCreationFailed
        | ConnectOutcome::SendFailed
        | ConnectOutcome::PollFailed => TRANSPORT_ERROR,
    }
}
