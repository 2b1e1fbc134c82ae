//! Tokio counterpart of [`crate::Connection`].
//!
//! Same state rules and request semantics; waits suspend the task instead of
//! blocking a thread.

use std::net::SocketAddr;
use std::time::Instant;

use oscprims_frame::{encode, printable, tag_name, type_tags, Argument, Message};
use oscprims_transport::{AsyncUdpTransport, Received};
use tracing::{debug, info, trace, warn};

use crate::connection::{reply_for, ConnectionConfig, ConnectionState};
use crate::error::{PeerError, Result};
use crate::handshake::{probe_async, ConnectOutcome};

/// Async connection to one console.
#[derive(Debug)]
pub struct AsyncConnection {
    host: String,
    port: u16,
    config: ConnectionConfig,
    transport: Option<AsyncUdpTransport>,
    probe_reply: Option<Message>,
    last_error: Option<PeerError>,
}

impl AsyncConnection {
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

    pub fn with_config(host: impl Into<String>, port: u16, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(host, port)
        })
    }

    /// Open the socket and run the liveness probe.
    pub async fn connect(&mut self) -> ConnectOutcome {
        self.close();

        let transport = match AsyncUdpTransport::open(&self.host, self.port).await {
            Ok(transport) => transport,
            Err(err) => {
                warn!(host = %self.host, port = self.port, %err, "socket creation failed");
                self.last_error = Some(err.into());
                return ConnectOutcome::SocketCreationFailed;
            }
        };

        let result = probe_async(
            &transport,
            &self.config.probe_address,
            self.config.probe_timeout,
            self.config.max_datagram,
        )
        .await;

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

    pub fn close(&mut self) {
        self.transport = None;
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
        self.transport.is_some()
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.transport.as_ref().map(AsyncUdpTransport::remote_addr)
    }

    pub fn probe_reply(&self) -> Option<&Message> {
        self.probe_reply.as_ref()
    }

    pub fn last_error(&self) -> Option<&PeerError> {
        self.last_error.as_ref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Send a command. No reply is awaited. Returns the number of bytes sent.
    pub async fn command(&mut self, address: &str, args: &[Argument]) -> Result<usize> {
        let transport = self.transport.as_ref().ok_or(PeerError::NotConnected)?;
        let type_tags = type_tags(args);
        let frame = encode(address, &type_tags, args)?;
        let sent = transport.send(&frame).await?;
        debug!(address, type_tags = %type_tags, sent, "command sent");
        Ok(sent)
    }

    /// Send a message and wait for the reply to the same address.
    pub async fn request(&mut self, address: &str, args: &[Argument]) -> Result<Option<Message>> {
        self.command(address, args).await?;

        let transport = self.transport.as_ref().ok_or(PeerError::NotConnected)?;
        let timeout = self.config.reply_timeout;
        let start = Instant::now();
        let mut wait = timeout;
        loop {
            let datagram = match transport.recv(self.config.max_datagram, wait).await? {
                Received::Data(datagram) => datagram,
                Received::Timeout => return Ok(None),
            };
            trace!(reply = %printable(&datagram), "reply datagram");
            if let Some(msg) = reply_for(address, &datagram)? {
                return Ok(Some(msg));
            }
            wait = timeout.remaining_since(start);
        }
    }

    /// Query the first argument at `address`.
    pub async fn query(&mut self, address: &str) -> Result<Option<Argument>> {
        let reply = self.request(address, &[]).await?;
        Ok(reply.and_then(|msg| msg.args.into_iter().next()))
    }

    pub async fn query_int(&mut self, address: &str) -> Result<Option<i32>> {
        let arg = self.query(address).await?;
        typed(address, arg, "int32", |arg| arg.as_int())
    }

    pub async fn query_float(&mut self, address: &str) -> Result<Option<f32>> {
        let arg = self.query(address).await?;
        typed(address, arg, "float32", |arg| arg.as_float())
    }

    pub async fn query_text(&mut self, address: &str) -> Result<Option<String>> {
        let arg = self.query(address).await?;
        typed(address, arg, "text", |arg| arg.as_text().map(str::to_string))
    }

    pub async fn command_int(&mut self, address: &str, value: i32) -> Result<usize> {
        self.command(address, &[Argument::Int(value)]).await
    }

    pub async fn command_float(&mut self, address: &str, value: f32) -> Result<usize> {
        self.command(address, &[Argument::Float(value)]).await
    }

    pub async fn command_text(&mut self, address: &str, value: &str) -> Result<usize> {
        self.command(address, &[Argument::from(value)]).await
    }

    /// Read the value at `from` and write it to `to`. `false` when `from` is silent.
    pub async fn copy_value(&mut self, from: &str, to: &str) -> Result<bool> {
        let Some(value) = self.query(from).await? else {
            return Ok(false);
        };
        self.command(to, std::slice::from_ref(&value)).await?;
        Ok(true)
    }
}

fn typed<T>(
    address: &str,
    arg: Option<Argument>,
    expected: &'static str,
    extract: impl FnOnce(&Argument) -> Option<T>,
) -> Result<Option<T>> {
    let Some(arg) = arg else {
        return Ok(None);
    };
    extract(&arg)
        .map(Some)
        .ok_or_else(|| PeerError::UnexpectedType {
            address: address.to_string(),
            expected,
            found: tag_name(arg.tag()),
        })
}
