use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use oscprims_frame::{decode, encode, printable, Message};
use oscprims_transport::{Received, RecvTimeout, UdpTransport};
use tracing::{debug, trace};

use crate::error::{PeerError, Result};

/// Probe address answered by full-size consoles.
pub const INFO_PROBE_ADDRESS: &str = "/info";

/// Probe address answered by rack-mount consoles.
pub const XINFO_PROBE_ADDRESS: &str = "/xinfo";

/// How a connection attempt ended.
///
/// Only [`ConnectOutcome::Confirmed`] leaves the connection usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectOutcome {
    /// The OS refused to create the socket, or the host did not resolve.
    SocketCreationFailed,
    /// The probe datagram could not be sent.
    SendFailed,
    /// Waiting for the probe reply failed at the OS level.
    PollFailed,
    /// No matching reply arrived in time: no device, wrong device, or packet loss.
    TimedOut,
    /// The console answered the probe.
    Confirmed,
}

impl ConnectOutcome {
    pub fn is_confirmed(self) -> bool {
        self == ConnectOutcome::Confirmed
    }

    /// Stable lowercase name for logs and machine-readable output.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectOutcome::SocketCreationFailed => "socket_creation_failed",
            ConnectOutcome::SendFailed => "send_failed",
            ConnectOutcome::PollFailed => "poll_failed",
            ConnectOutcome::TimedOut => "timed_out",
            ConnectOutcome::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for ConnectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one liveness probe.
#[derive(Debug)]
pub struct HandshakeResult {
    /// How the probe ended.
    pub outcome: ConnectOutcome,
    /// The console's decoded reply, when confirmed and decodable.
    pub reply: Option<Message>,
    /// The underlying failure for the `*Failed` outcomes.
    pub error: Option<PeerError>,
}

impl HandshakeResult {
    fn failed(outcome: ConnectOutcome, error: PeerError) -> Self {
        Self {
            outcome,
            reply: None,
            error: Some(error),
        }
    }

    fn timed_out() -> Self {
        Self {
            outcome: ConnectOutcome::TimedOut,
            reply: None,
            error: None,
        }
    }
}

/// Build the error for a probe that ended without confirmation.
pub(crate) fn handshake_error(outcome: ConnectOutcome, cause: Option<&PeerError>) -> PeerError {
    let detail = match cause {
        Some(err) => err.to_string(),
        None if outcome == ConnectOutcome::TimedOut => "no reply to liveness probe".to_string(),
        None => "no detail".to_string(),
    };
    PeerError::Handshake { outcome, detail }
}

/// Encode the zero-argument probe query.
pub fn probe_frame(probe_address: &str) -> Result<Bytes> {
    if !probe_address.starts_with('/') {
        return Err(PeerError::InvalidConfig(format!(
            "probe address {probe_address:?} must start with '/'"
        )));
    }
    Ok(encode(probe_address, "", &[])?)
}

/// A reply confirms the probe when its leading bytes are the probe address.
pub fn probe_matches(probe_address: &str, datagram: &[u8]) -> bool {
    datagram.starts_with(probe_address.as_bytes())
}

/// Send the liveness probe over `transport` and wait for the console to answer.
///
/// Replies that do not start with the probe address are ignored until the
/// timeout runs out.
pub fn probe(
    transport: &UdpTransport,
    probe_address: &str,
    timeout: RecvTimeout,
    max_datagram: usize,
) -> HandshakeResult {
    let frame = match probe_frame(probe_address) {
        Ok(frame) => frame,
        Err(err) => return HandshakeResult::failed(ConnectOutcome::SendFailed, err),
    };

    if let Err(err) = transport.send(&frame) {
        return HandshakeResult::failed(ConnectOutcome::SendFailed, err.into());
    }

    let start = Instant::now();
    let mut wait = timeout;
    loop {
        match transport.recv(max_datagram, wait) {
            Ok(Received::Timeout) => return HandshakeResult::timed_out(),
            Ok(Received::Data(datagram)) => {
                if let Some(result) = check_reply(probe_address, &datagram) {
                    return result;
                }
                wait = timeout.remaining_since(start);
            }
            Err(err) => return HandshakeResult::failed(ConnectOutcome::PollFailed, err.into()),
        }
    }
}

/// Async variant of [`probe`].
#[cfg(feature = "async")]
pub async fn probe_async(
    transport: &oscprims_transport::AsyncUdpTransport,
    probe_address: &str,
    timeout: RecvTimeout,
    max_datagram: usize,
) -> HandshakeResult {
    let frame = match probe_frame(probe_address) {
        Ok(frame) => frame,
        Err(err) => return HandshakeResult::failed(ConnectOutcome::SendFailed, err),
    };

    if let Err(err) = transport.send(&frame).await {
        return HandshakeResult::failed(ConnectOutcome::SendFailed, err.into());
    }

    let start = Instant::now();
    let mut wait = timeout;
    loop {
        match transport.recv(max_datagram, wait).await {
            Ok(Received::Timeout) => return HandshakeResult::timed_out(),
            Ok(Received::Data(datagram)) => {
                if let Some(result) = check_reply(probe_address, &datagram) {
                    return result;
                }
                wait = timeout.remaining_since(start);
            }
            Err(err) => return HandshakeResult::failed(ConnectOutcome::PollFailed, err.into()),
        }
    }
}

fn check_reply(probe_address: &str, datagram: &[u8]) -> Option<HandshakeResult> {
    trace!(reply = %printable(datagram), "probe reply");
    if !probe_matches(probe_address, datagram) {
        debug!(
            probe_address,
            reply = %printable(datagram),
            "ignoring reply that does not match probe"
        );
        return None;
    }

    // Some firmware answers with a bare address; confirmation does not need the body.
    let reply = match decode(datagram) {
        Ok(msg) => Some(msg),
        Err(err) => {
            debug!(%err, "probe reply body not decodable");
            None
        }
    };
    Some(HandshakeResult {
        outcome: ConnectOutcome::Confirmed,
        reply,
        error: None,
    })
}
