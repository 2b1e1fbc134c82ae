use std::io::ErrorKind;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::timeout::RecvTimeout;
use crate::udp::{local_bind_addr, Received, MAX_DATAGRAM};

/// Tokio counterpart of [`crate::UdpTransport`].
///
/// Waiting suspends the task on socket readiness instead of blocking a thread.
/// The single-endpoint and one-datagram-per-receive rules are the same.
#[derive(Debug)]
pub struct AsyncUdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl AsyncUdpTransport {
    /// Resolve `host` and open a socket towards `host:port`.
    pub async fn open(host: &str, port: u16) -> Result<Self> {
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

        let remote = tokio::net::lookup_host((host, port))
            .await
            .map_err(resolve_err)?
            .next()
            .ok_or_else(|| {
                resolve_err(std::io::Error::new(
                    ErrorKind::NotFound,
                    "no addresses returned",
                ))
            })?;
        Self::open_addr(remote).await
    }

    /// Open a socket towards an already resolved endpoint.
    pub async fn open_addr(remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local_bind_addr(&remote))
            .await
            .map_err(TransportError::Socket)?;
        debug!(%remote, local = ?socket.local_addr().ok(), "opened async udp transport");
        Ok(Self { socket, remote })
    }

    /// Transmit one datagram to the remote endpoint.
    pub async fn send(&self, datagram: &[u8]) -> Result<usize> {
        if datagram.len() > MAX_DATAGRAM {
            return Err(TransportError::DatagramTooLarge {
                len: datagram.len(),
                max: MAX_DATAGRAM,
            });
        }
        let sent = self
            .socket
            .send_to(datagram, self.remote)
            .await
            .map_err(TransportError::Send)?;
        trace!(remote = %self.remote, sent, "sent datagram");
        Ok(sent)
    }

    /// Wait for one datagram from the remote endpoint.
    pub async fn recv(&self, max_len: usize, timeout: RecvTimeout) -> Result<Received> {
        let deadline = timeout
            .deadline_from(std::time::Instant::now())
            .map(tokio::time::Instant::from_std);
        let mut buf = vec![0u8; max_len];

        loop {
            let result = match (timeout, deadline) {
                (RecvTimeout::Poll, _) => match self.socket.try_recv_from(&mut buf) {
                    Err(err) if err.kind() == ErrorKind::WouldBlock => {
                        return Ok(Received::Timeout);
                    }
                    other => other,
                },
                (_, Some(deadline)) => {
                    match tokio::time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
                    {
                        Ok(result) => result,
                        Err(_elapsed) => return Ok(Received::Timeout),
                    }
                }
                (_, None) => self.socket.recv_from(&mut buf).await,
            };

            match result {
                Ok((len, from)) if from == self.remote => {
                    trace!(remote = %from, len, "received datagram");
                    buf.truncate(len);
                    return Ok(Received::Data(Bytes::from(buf)));
                }
                Ok((len, from)) => {
                    debug!(%from, expected = %self.remote, len, "dropping datagram from unexpected source");
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
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
