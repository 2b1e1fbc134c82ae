use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use oscprims_frame::{decode, printable, Message, DEFAULT_MAX_FRAME};
use oscprims_transport::{Received, RecvTimeout, UdpTransport};
use tracing::{debug, info, trace, warn};

use crate::error::{PeerError, Result};
use crate::handshake::{probe, probe_frame, probe_matches, ConnectOutcome, INFO_PROBE_ADDRESS};

/// Default UDP port of the console's control server.
pub const DEFAULT_PORT: u16 = 10023;

/// Default wait for the liveness probe reply.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Default wait for a query reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(50);

/// Whether a connection currently owns a live socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Configuration for one console connection.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Zero-argument query used as the liveness probe.
    pub probe_address: String,
    /// Wait for the probe reply.
    pub probe_timeout: RecvTimeout,
    /// Wait for each query reply.
    pub reply_timeout: RecvTimeout,
    /// Largest datagram accepted on receive; longer ones are truncated by the OS.
    pub max_datagram: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            probe_address: INFO_PROBE_ADDRESS.to_string(),
            probe_timeout: RecvTimeout::After(DEFAULT_PROBE_TIMEOUT),
            reply_timeout: RecvTimeout::After(DEFAULT_REPLY_TIMEOUT),
            max_datagram: DEFAULT_MAX_FRAME,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("probe_address", &self.probe_address)
            .field("probe_timeout_ms", &self.probe_timeout.as_millis())
            .field("reply_timeout_ms", &self.reply_timeout.as_millis())
            .field("max_datagram", &self.max_datagram)
            .finish()
    }
}

impl ConnectionConfig {
    /// Reject configurations that could never complete a handshake.
    pub fn validate(&self) -> Result<()> {
        probe_frame(&self.probe_address)?;
        if self.max_datagram == 0 {
            return Err(PeerError::InvalidConfig(
                "max_datagram must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A controller's connection to one console.
///
/// Starts disconnected. [`Connection::connect`] opens a socket and runs the
/// liveness probe; the socket is kept only when the console confirms. Every
/// request takes `&mut self`, so one connection never has two requests in
/// flight. Dropping the connection closes the socket.
pub struct Connection {
    host: String,
    port: u16,
    config: ConnectionConfig,
    transport: Option<UdpTransport>,
    probe_reply: Option<Message>,
    last_error: Option<PeerError>,
}

impl Connection {
    /// A disconnected connection to `host:port` with default configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            config: ConnectionConfig::default(),
            transport: None,
            probe_reply: None,
            last_error: None,
        }
    }

    /// A disconnected connection with explicit configuration.
    pub fn with_config(host: impl Into<String>, port: u16, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(host, port)
        })
    }

    /// Open the socket and confirm the console is alive.
    ///
    /// Any previous socket is closed first. Only
    /// [`ConnectOutcome::Confirmed`] leaves the connection connected; the
    /// cause of any other outcome is available from [`Connection::last_error`].
    pub fn connect(&mut self) -> ConnectOutcome {
        self.close();

        let transport = match UdpTransport::open(&self.host, self.port) {
            Ok(transport) => transport,
            Err(err) => {
                warn!(host = %self.host, port = self.port, %err, "socket creation failed");
                self.last_error = Some(err.into());
                return ConnectOutcome::SocketCreationFailed;
            }
        };

        let result = probe(
            &transport,
            &self.config.probe_address,
            self.config.probe_timeout,
            self.config.max_datagram,
        );

        if result.outcome.is_confirmed() {
            info!(remote = %transport.remote_addr(), "console confirmed");
            self.transport = Some(transport);
            self.probe_reply = result.reply;
        } else {
            warn!(host = %self.host, port = self.port, outcome = %result.outcome, "console not confirmed");
            self.last_error = result.error;
        }
        result.outcome
    }

    /// Close the socket. The connection can be connected again later.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            debug!(remote = %transport.remote_addr(), "closing connection");
        }
        self.probe_reply = None;
        self.last_error = None;
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Host the connection was created for.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolved remote endpoint, when connected.
    pub fn remote(&self) -> Option<SocketAddr> {
        self.transport.as_ref().map(UdpTransport::remote_addr)
    }

    /// The console's reply to the last confirmed probe.
    ///
    /// For the default probe these are identity strings such as firmware
    /// version and model.
    pub fn probe_reply(&self) -> Option<&Message> {
        self.probe_reply.as_ref()
    }

    /// Why the last `connect` did not confirm, when there was an OS-level cause.
    pub fn last_error(&self) -> Option<&PeerError> {
        self.last_error.as_ref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Override the per-query reply timeout.
    pub fn set_reply_timeout(&mut self, timeout: RecvTimeout) {
        self.config.reply_timeout = timeout;
    }

    pub(crate) fn transport(&self) -> Result<&UdpTransport> {
        self.transport.as_ref().ok_or(PeerError::NotConnected)
    }

    /// Wait for a reply addressed to `address`.
    ///
    /// Replies for other addresses (late answers to earlier queries) are
    /// discarded; the wait continues against the same deadline.
    pub(crate) fn await_reply(&mut self, address: &str) -> Result<Option<Message>> {
        let transport = self.transport()?;
        let timeout = self.config.reply_timeout;
        let start = Instant::now();
        let mut wait = timeout;

        loop {
            let datagram = match transport.recv(self.config.max_datagram, wait)? {
                Received::Data(datagram) => datagram,
                Received::Timeout => {
                    debug!(address, "no reply");
                    return Ok(None);
                }
            };
            trace!(reply = %printable(&datagram), "reply datagram");
            if let Some(msg) = reply_for(address, &datagram)? {
                return Ok(Some(msg));
            }
            wait = timeout.remaining_since(start);
        }
    }
}

/// Decode a datagram received while waiting for the reply to `address`.
///
/// `Ok(None)` means the datagram belongs elsewhere and is dropped: a late
/// reply for another address, or bytes that neither decode nor start with
/// `address`. Undecodable bytes that do start with `address` are an error.
pub(crate) fn reply_for(address: &str, datagram: &[u8]) -> Result<Option<Message>> {
    match decode(datagram) {
        Ok(msg) if msg.address == address => Ok(Some(msg)),
        Ok(msg) => {
            debug!(expected = address, got = %msg.address, "discarding reply for another address");
            Ok(None)
        }
        Err(err) if probe_matches(address, datagram) => Err(err.into()),
        Err(err) => {
            debug!(expected = address, %err, "discarding undecodable datagram");
            Ok(None)
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use oscprims_frame::{encode, Argument, FrameError};

    use super::*;
    use crate::emulator::ConsoleEmulator;

    #[test]
    fn reply_for_sorts_datagrams() {
        let wanted = "/ch/01/mix/fader";
        let own = encode(wanted, "f", &[Argument::Float(0.9)]).unwrap();
        let other = encode("/ch/02/mix/fader", "f", &[Argument::Float(0.1)]).unwrap();

        assert_eq!(
            reply_for(wanted, &own).unwrap().unwrap().args,
            vec![Argument::Float(0.9)]
        );
        assert!(reply_for(wanted, &other).unwrap().is_none());
        assert!(reply_for(wanted, &other[..other.len() - 4]).unwrap().is_none());
        assert!(matches!(
            reply_for(wanted, &own[..own.len() - 4]),
            Err(PeerError::Frame(FrameError::MalformedFrame { .. }))
        ));
    }

    #[test]
    fn starts_disconnected() {
        let conn = Connection::new("127.0.0.1", DEFAULT_PORT);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.remote().is_none());
        assert!(conn.probe_reply().is_none());
    }

    #[test]
    fn connect_confirms_emulator() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = Connection::new("127.0.0.1", console.port());

        assert_eq!(conn.connect(), ConnectOutcome::Confirmed);
        assert!(conn.is_connected());
        assert_eq!(conn.remote().unwrap().port(), console.port());
        assert_eq!(conn.probe_reply().unwrap().args[2].as_text(), Some("EMULATOR"));
    }

    #[test]
    fn silent_endpoint_times_out_and_stays_disconnected() {
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = silent.local_addr().unwrap().port();
        let config = ConnectionConfig {
            probe_timeout: RecvTimeout::from_millis(50),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", port, config).unwrap();

        assert_eq!(conn.connect(), ConnectOutcome::TimedOut);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.last_error().is_none());
    }

    #[test]
    fn closed_port_times_out() {
        // Bind then drop to get a port with nothing behind it.
        let port = {
            let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
            socket.local_addr().unwrap().port()
        };
        let config = ConnectionConfig {
            probe_timeout: RecvTimeout::from_millis(50),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", port, config).unwrap();

        assert_eq!(conn.connect(), ConnectOutcome::TimedOut);
        assert!(!conn.is_connected());
    }

    #[test]
    fn unresolvable_host_is_socket_failure() {
        let mut conn = Connection::new("", DEFAULT_PORT);
        assert_eq!(conn.connect(), ConnectOutcome::SocketCreationFailed);
        assert!(matches!(conn.last_error(), Some(PeerError::Transport(_))));
        assert!(!conn.is_connected());
    }

    #[test]
    fn reconnect_after_console_goes_silent() {
        let console = ConsoleEmulator::spawn().unwrap();
        let config = ConnectionConfig {
            probe_timeout: RecvTimeout::from_millis(50),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", console.port(), config).unwrap();
        assert!(conn.connect().is_confirmed());

        console.set_muted(true);
        assert_eq!(conn.connect(), ConnectOutcome::TimedOut);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(conn.probe_reply().is_none());
    }

    #[test]
    fn close_releases_socket() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = Connection::new("127.0.0.1", console.port());
        assert!(conn.connect().is_confirmed());

        conn.close();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert!(matches!(conn.transport(), Err(PeerError::NotConnected)));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ConnectionConfig {
            probe_address: String::new(),
            ..ConnectionConfig::default()
        };
        assert!(matches!(
            Connection::with_config("127.0.0.1", DEFAULT_PORT, config),
            Err(PeerError::InvalidConfig(_))
        ));

        let config = ConnectionConfig {
            max_datagram: 0,
            ..ConnectionConfig::default()
        };
        assert!(Connection::with_config("127.0.0.1", DEFAULT_PORT, config).is_err());
    }

    #[test]
    fn xinfo_probe_address() {
        let console = ConsoleEmulator::spawn().unwrap();
        let config = ConnectionConfig {
            probe_address: crate::handshake::XINFO_PROBE_ADDRESS.to_string(),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", console.port(), config).unwrap();
        assert!(conn.connect().is_confirmed());
        assert_eq!(conn.probe_reply().unwrap().address, "/xinfo");
    }
}
