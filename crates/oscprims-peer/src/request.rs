//! Commands, queries and typed accessors on a connected [`Connection`].
//!
//! A command is fire-and-forget. A query sends the address with no
//! arguments and waits up to the reply timeout for the console to echo the
//! address back with the current value. A missing reply is `Ok(None)`, not an
//! error: the console is silent for addresses it does not know.

use bytes::BytesMut;
use oscprims_frame::{encode, encode_message, tag_name, type_tags, Argument, Message};
use tracing::{debug, trace};

use crate::connection::Connection;
use crate::error::{PeerError, Result};

impl Connection {
    /// Send `address` with `args`. No reply is awaited.
    ///
    /// Returns the number of bytes sent.
    pub fn command(&mut self, address: &str, args: &[Argument]) -> Result<usize> {
        let transport = self.transport()?;
        let type_tags = type_tags(args);
        let frame = encode(address, &type_tags, args)?;
        let sent = transport.send(&frame)?;
        debug!(address, type_tags = %type_tags, sent, "command sent");
        Ok(sent)
    }

    /// Send a message whose tag string is given explicitly. No reply is awaited.
    ///
    /// The tags are checked against `args` before anything is sent.
    pub fn command_tagged(&mut self, address: &str, type_tags: &str, args: &[Argument]) -> Result<usize> {
        let transport = self.transport()?;
        let frame = encode(address, type_tags, args)?;
        Ok(transport.send(&frame)?)
    }

    /// Send an already built message. No reply is awaited.
    pub fn send_message(&mut self, msg: &Message) -> Result<usize> {
        let transport = self.transport()?;
        let mut frame = BytesMut::with_capacity(msg.wire_size());
        encode_message(msg, &mut frame)?;
        let sent = transport.send(&frame)?;
        debug!(address = %msg.address, sent, "message sent");
        Ok(sent)
    }

    /// Send `address` with `args` and wait for the console's reply to the same address.
    pub fn request(&mut self, address: &str, args: &[Argument]) -> Result<Option<Message>> {
        self.command(address, args)?;
        let reply = self.await_reply(address)?;
        if let Some(msg) = &reply {
            trace!(%msg, "reply");
        }
        Ok(reply)
    }

    /// Query the current value at `address`: the first argument of the reply.
    ///
    /// A reply with no arguments counts as no answer.
    pub fn query(&mut self, address: &str) -> Result<Option<Argument>> {
        let reply = self.request(address, &[])?;
        Ok(reply.and_then(|msg| msg.args.into_iter().next()))
    }

    /// Query an integer parameter.
    pub fn query_int(&mut self, address: &str) -> Result<Option<i32>> {
        self.query_typed(address, "int32", |arg| arg.as_int())
    }

    /// Query a float parameter.
    pub fn query_float(&mut self, address: &str) -> Result<Option<f32>> {
        self.query_typed(address, "float32", |arg| arg.as_float())
    }

    /// Query a text parameter.
    pub fn query_text(&mut self, address: &str) -> Result<Option<String>> {
        self.query_typed(address, "text", |arg| arg.as_text().map(str::to_string))
    }

    /// Set an integer parameter.
    pub fn command_int(&mut self, address: &str, value: i32) -> Result<usize> {
        self.command(address, &[Argument::Int(value)])
    }

    /// Set a float parameter.
    pub fn command_float(&mut self, address: &str, value: f32) -> Result<usize> {
        self.command(address, &[Argument::Float(value)])
    }

    /// Set a text parameter.
    pub fn command_text(&mut self, address: &str, value: &str) -> Result<usize> {
        self.command(address, &[Argument::from(value)])
    }

    /// Read the value at `from` and write it to `to` with the same type.
    ///
    /// Returns `false` when `from` did not answer; nothing is written then.
    pub fn copy_value(&mut self, from: &str, to: &str) -> Result<bool> {
        let Some(value) = self.query(from)? else {
            debug!(from, "copy source did not answer");
            return Ok(false);
        };
        self.command(to, std::slice::from_ref(&value))?;
        debug!(from, to, %value, "value copied");
        Ok(true)
    }

    fn query_typed<T>(
        &mut self,
        address: &str,
        expected: &'static str,
        extract: impl FnOnce(&Argument) -> Option<T>,
    ) -> Result<Option<T>> {
        let Some(arg) = self.query(address)? else {
            return Ok(None);
        };
        match extract(&arg) {
            Some(value) => Ok(Some(value)),
            None => Err(PeerError::UnexpectedType {
                address: address.to_string(),
                expected,
                found: tag_name(arg.tag()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::thread;
    use std::time::Duration;

    use oscprims_frame::decode;
    use oscprims_transport::RecvTimeout;

    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::emulator::ConsoleEmulator;

    fn connected(console: &ConsoleEmulator) -> Connection {
        let config = ConnectionConfig {
            reply_timeout: RecvTimeout::from_millis(500),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", console.port(), config).unwrap();
        assert!(conn.connect().is_confirmed());
        conn
    }

    #[test]
    fn query_float_returns_stored_value() {
        let console = ConsoleEmulator::spawn().unwrap();
        console.set("/ch/01/mix/fader", vec![Argument::Float(0.75)]);
        let mut conn = connected(&console);

        assert_eq!(conn.query_float("/ch/01/mix/fader").unwrap(), Some(0.75));
    }

    #[test]
    fn command_then_query() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = connected(&console);

        assert_eq!(conn.command_int("/ch/03/mix/on", 0).unwrap(), 24);
        conn.command_text("/ch/03/config/name", "Kick").unwrap();
        assert_eq!(conn.query_int("/ch/03/mix/on").unwrap(), Some(0));
        assert_eq!(
            conn.query_text("/ch/03/config/name").unwrap().as_deref(),
            Some("Kick")
        );
    }

    #[test]
    fn unknown_address_gets_no_reply() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = connected(&console);
        conn.set_reply_timeout(RecvTimeout::from_millis(50));

        assert_eq!(conn.query_float("/ch/99/mix/fader").unwrap(), None);
    }

    #[test]
    fn wrong_reply_type_is_an_error() {
        let console = ConsoleEmulator::spawn().unwrap();
        console.set("/ch/01/mix/on", vec![Argument::Int(1)]);
        let mut conn = connected(&console);

        let err = conn.query_float("/ch/01/mix/on").unwrap_err();
        assert!(matches!(
            err,
            PeerError::UnexpectedType {
                expected: "float32",
                found: "int32",
                ..
            }
        ));
    }

    #[test]
    fn copy_value_preserves_type() {
        let console = ConsoleEmulator::spawn().unwrap();
        console.set("/ch/01/mix/fader", vec![Argument::Float(0.5)]);
        let mut conn = connected(&console);

        assert!(conn.copy_value("/ch/01/mix/fader", "/ch/02/mix/fader").unwrap());
        assert_eq!(conn.query_float("/ch/02/mix/fader").unwrap(), Some(0.5));
    }

    #[test]
    fn copy_value_from_silent_source() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = connected(&console);
        conn.set_reply_timeout(RecvTimeout::from_millis(50));

        assert!(!conn.copy_value("/ch/40/mix/fader", "/ch/02/mix/fader").unwrap());
        assert_eq!(console.get("/ch/02/mix/fader"), None);
    }

    #[test]
    fn requests_fail_when_disconnected() {
        let mut conn = Connection::new("127.0.0.1", 10023);
        assert!(matches!(
            conn.command_int("/ch/01/mix/on", 1),
            Err(PeerError::NotConnected)
        ));
        assert!(matches!(
            conn.query("/ch/01/mix/on"),
            Err(PeerError::NotConnected)
        ));
    }

    #[test]
    fn invalid_command_is_not_sent() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = connected(&console);
        let before = console.received();

        assert!(matches!(
            conn.command_tagged("/ch/01/mix/on", "f", &[Argument::Int(1)]),
            Err(PeerError::Frame(_))
        ));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(console.received(), before);
    }

    #[test]
    fn stale_reply_is_discarded() {
        let console = UdpSocket::bind("127.0.0.1:0").unwrap();
        console
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = console.local_addr().unwrap().port();

        let responder = thread::spawn(move || {
            let mut buf = [0u8; 512];
            // Probe.
            let (len, from) = console.recv_from(&mut buf).unwrap();
            let probe = decode(&buf[..len]).unwrap();
            let reply = encode(&probe.address, "", &[]).unwrap();
            console.send_to(&reply, from).unwrap();

            // Query: answer a late reply for another address first.
            let (len, from) = console.recv_from(&mut buf).unwrap();
            let query = decode(&buf[..len]).unwrap();
            let stale = encode("/ch/02/mix/fader", "f", &[Argument::Float(0.1)]).unwrap();
            console.send_to(&stale, from).unwrap();
            let fresh = encode(&query.address, "f", &[Argument::Float(0.9)]).unwrap();
            console.send_to(&fresh, from).unwrap();
        });

        let config = ConnectionConfig {
            probe_timeout: RecvTimeout::from_millis(2000),
            reply_timeout: RecvTimeout::from_millis(2000),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", port, config).unwrap();
        assert!(conn.connect().is_confirmed());
        assert_eq!(conn.query_float("/ch/01/mix/fader").unwrap(), Some(0.9));
        responder.join().unwrap();
    }

    #[test]
    fn undecodable_stray_datagram_is_discarded() {
        let console = UdpSocket::bind("127.0.0.1:0").unwrap();
        console
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = console.local_addr().unwrap().port();

        let responder = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, from) = console.recv_from(&mut buf).unwrap();
            let probe = decode(&buf[..len]).unwrap();
            let reply = encode(&probe.address, "", &[]).unwrap();
            console.send_to(&reply, from).unwrap();

            // Query: a float reply for another address cut before its payload.
            let (len, from) = console.recv_from(&mut buf).unwrap();
            let query = decode(&buf[..len]).unwrap();
            let stale = encode("/ch/02/mix/fader", "f", &[Argument::Float(0.1)]).unwrap();
            console.send_to(&stale[..stale.len() - 4], from).unwrap();
            let fresh = encode(&query.address, "f", &[Argument::Float(0.9)]).unwrap();
            console.send_to(&fresh, from).unwrap();
        });

        let config = ConnectionConfig {
            probe_timeout: RecvTimeout::from_millis(2000),
            reply_timeout: RecvTimeout::from_millis(2000),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::with_config("127.0.0.1", port, config).unwrap();
        assert!(conn.connect().is_confirmed());
        assert_eq!(conn.query_float("/ch/01/mix/fader").unwrap(), Some(0.9));
        responder.join().unwrap();
    }

    #[test]
    fn request_returns_whole_reply() {
        let console = ConsoleEmulator::spawn_with(|msg| {
            if msg.address == "/info" {
                return vec![Message::query("/info")];
            }
            vec![Message::new(
                msg.address.clone(),
                vec![Argument::Int(2), Argument::Float(-3.5)],
            )]
        })
        .unwrap();
        let mut conn = connected(&console);

        let reply = conn.request("/ch/01/eq/1", &[]).unwrap().unwrap();
        assert_eq!(reply.type_tags(), "if");
        assert_eq!(conn.query_int("/ch/01/eq/1").unwrap(), Some(2));
    }

    #[test]
    fn send_message_matches_command() {
        let console = ConsoleEmulator::spawn().unwrap();
        let mut conn = connected(&console);

        let sent = conn
            .send_message(&Message::new("/ch/05/mix/pan", vec![Argument::Float(0.25)]))
            .unwrap();
        assert_eq!(sent, 24);
        assert_eq!(conn.query_float("/ch/05/mix/pan").unwrap(), Some(0.25));
    }
}
