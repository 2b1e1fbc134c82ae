use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::timeout::RecvTimeout;

/// Largest payload a single UDP/IPv4 datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

/// Outcome of a bounded receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One datagram from the remote endpoint, truncated to the requested length.
    Data(Bytes),
    /// Nothing arrived before the timeout. Not an error.
    Timeout,
}

impl Received {
    /// The datagram bytes, if any arrived.
    pub fn into_data(self) -> Option<Bytes> {
        match self {
            Received::Data(bytes) => Some(bytes),
            Received::Timeout => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Received::Timeout)
    }
}

/// Resolve `host:port` to the first matching socket address.
///
/// `host` may be an IP literal or a hostname.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let resolve_err = |source| TransportError::Resolve {
        host: host.to_string(),
        source,
    };

    if host.trim().is_empty() {
        return Err(resolve_err(std::io::Error::new(
            ErrorKind::InvalidInput,
            "host must not be empty",
        )));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| {
            resolve_err(std::io::Error::new(
                ErrorKind::NotFound,
                "no addresses returned",
            ))
        })
}

/// Unspecified local address of the same family as `remote`, ephemeral port.
pub(crate) fn local_bind_addr(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}

/// Non-blocking UDP socket tied to one remote endpoint.
///
/// Sends always go to the remote endpoint; datagrams arriving from any other
/// source are dropped on receive. The socket is closed when the transport is
/// dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpTransport {
    /// Resolve `host` and open a socket towards `host:port`.
    ///
    /// This does not check that anything is listening on the remote side.
    pub fn open(host: &str, port: u16) -> Result<Self> {
        let remote = resolve(host, port)?;
        Self::open_addr(remote)
    }

    /// Open a socket towards an already resolved endpoint.
    pub fn open_addr(remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local_bind_addr(&remote)).map_err(TransportError::Socket)?;
        socket
            .set_nonblocking(true)
            .map_err(TransportError::Socket)?;

        debug!(%remote, local = ?socket.local_addr().ok(), "opened udp transport");

        Ok(Self { socket, remote })
    }

    /// Transmit one datagram to the remote endpoint.
    ///
    /// Exactly one non-blocking send call is made. There is no retry.
    pub fn send(&self, datagram: &[u8]) -> Result<usize> {
        if datagram.len() > MAX_DATAGRAM {
            return Err(TransportError::DatagramTooLarge {
                len: datagram.len(),
                max: MAX_DATAGRAM,
            });
        }

        let sent = self
            .socket
            .send_to(datagram, self.remote)
            .map_err(TransportError::Send)?;
        trace!(remote = %self.remote, sent, "sent datagram");
        Ok(sent)
    }

    /// Wait for one datagram from the remote endpoint.
    ///
    /// At most `max_len` bytes are returned; the OS discards the rest of a
    /// longer datagram. Datagrams from other sources are dropped and the wait
    /// continues against the same deadline.
    pub fn recv(&self, max_len: usize, timeout: RecvTimeout) -> Result<Received> {
        let deadline = timeout.deadline_from(Instant::now());
        let mut buf = vec![0u8; max_len];

        loop {
            if !wait_readable(&self.socket, deadline)? {
                return Ok(Received::Timeout);
            }

            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) if from == self.remote => {
                    trace!(remote = %from, len, "received datagram");
                    buf.truncate(len);
                    return Ok(Received::Data(Bytes::from(buf)));
                }
                Ok((len, from)) => {
                    debug!(%from, expected = %self.remote, len, "dropping datagram from unexpected source");
                }
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock
                        || err.kind() == ErrorKind::Interrupted =>
                {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Ok(Received::Timeout);
                    }
                }
                Err(err) => return Err(TransportError::Recv(err)),
            }
        }
    }

    /// The remote endpoint this transport talks to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// The local address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(TransportError::Socket)
    }
}

/// Block until the socket is readable or the deadline passes.
///
/// Returns `Ok(false)` on timeout.
#[cfg(unix)]
fn wait_readable(socket: &UdpSocket, deadline: Option<Instant>) -> Result<bool> {
    use std::os::fd::AsRawFd;

    loop {
        let mut fds = libc::pollfd {
            fd: socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout = crate::timeout::remaining_poll_millis(deadline);

        // SAFETY: `fds` is a valid, writable pollfd array of length 1 and its
        // descriptor is owned by `socket` for the duration of the call.
        let rc = unsafe { libc::poll(&mut fds, 1, timeout) };

        match rc {
            0 => return Ok(false),
            n if n > 0 => return Ok(true),
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(TransportError::Poll(err));
            }
        }
    }
}

/// Readiness fallback for platforms without `poll(2)`: peek until data or deadline.
#[cfg(not(unix))]
fn wait_readable(socket: &UdpSocket, deadline: Option<Instant>) -> Result<bool> {
    let mut probe = vec![0u8; MAX_DATAGRAM];
    loop {
        match socket.peek_from(&mut probe) {
            Ok(_) => return Ok(true),
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Poll(err)),
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Ok(false);
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
}
