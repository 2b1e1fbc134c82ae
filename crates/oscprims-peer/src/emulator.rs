//! In-process console emulator on a loopback UDP socket.
//!
//! Answers the liveness probe with an identity reply, stores arguments sent to
//! an address, and answers zero-argument queries with the stored arguments.
//! Unknown addresses get no reply, like the real device.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::BytesMut;
use oscprims_frame::{decode, encode_message, Argument, Message};
use tracing::debug;

use crate::handshake::{INFO_PROBE_ADDRESS, XINFO_PROBE_ADDRESS};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const RECV_BUFFER_SIZE: usize = 2048;

type ParamStore = Arc<Mutex<HashMap<String, Vec<Argument>>>>;
type Responder = Box<dyn Fn(&Message, &ParamStore) -> Vec<Message> + Send>;

/// A console stand-in for tests and demos.
pub struct ConsoleEmulator {
    addr: SocketAddr,
    params: ParamStore,
    muted: Arc<AtomicBool>,
    received: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConsoleEmulator {
    /// Spawn an emulator on an ephemeral loopback port.
    pub fn spawn() -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0")
    }

    /// Spawn an emulator with the default parameter-store behaviour on `addr`.
    pub fn bind(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        Self::start(UdpSocket::bind(addr)?, Box::new(default_response))
    }

    /// Spawn an emulator whose replies come from `respond`.
    ///
    /// `respond` sees every decoded datagram and returns the messages to send
    /// back, in order.
    pub fn spawn_with<F>(respond: F) -> std::io::Result<Self>
    where
        F: Fn(&Message) -> Vec<Message> + Send + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0")?;
        Self::start(
            socket,
            Box::new(move |msg: &Message, _: &ParamStore| respond(msg)),
        )
    }

    fn start(socket: UdpSocket, respond: Responder) -> std::io::Result<Self> {
        socket.set_read_timeout(Some(POLL_INTERVAL))?;
        let addr = socket.local_addr()?;

        let params: ParamStore = Arc::default();
        let muted = Arc::new(AtomicBool::new(false));
        let received = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let params = Arc::clone(&params);
            let muted = Arc::clone(&muted);
            let received = Arc::clone(&received);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("console-emulator".to_string())
                .spawn(move || serve(socket, respond, params, muted, received, stop))?
        };

        debug!(%addr, "console emulator listening");
        Ok(Self {
            addr,
            params,
            muted,
            received,
            stop,
            handle: Some(handle),
        })
    }

    /// The emulator's socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Preload the arguments a query of `address` is answered with.
    pub fn set(&self, address: &str, args: Vec<Argument>) {
        if let Ok(mut params) = self.params.lock() {
            params.insert(address.to_string(), args);
        }
    }

    /// Current stored arguments for `address`.
    pub fn get(&self, address: &str) -> Option<Vec<Argument>> {
        self.params
            .lock()
            .ok()
            .and_then(|params| params.get(address).cloned())
    }

    /// Stop answering (datagrams are still consumed and counted).
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Number of datagrams received so far.
    pub fn received(&self) -> usize {
        self.received.load(Ordering::Relaxed)
    }
}

impl Drop for ConsoleEmulator {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(
    socket: UdpSocket,
    respond: Responder,
    params: ParamStore,
    muted: Arc<AtomicBool>,
    received: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut out = BytesMut::new();

    while !stop.load(Ordering::Relaxed) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(err) if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut => {
                continue
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                debug!(%err, "console emulator stopping");
                return;
            }
        };
        received.fetch_add(1, Ordering::Relaxed);

        let msg = match decode(&buf[..len]) {
            Ok(msg) => msg,
            Err(err) => {
                debug!(%err, "console emulator ignoring malformed datagram");
                continue;
            }
        };
        if muted.load(Ordering::Relaxed) {
            continue;
        }

        for reply in respond(&msg, &params) {
            out.clear();
            if encode_message(&reply, &mut out).is_ok() {
                let _ = socket.send_to(&out, from);
            }
        }
    }
}

fn default_response(msg: &Message, params: &ParamStore) -> Vec<Message> {
    if msg.address == INFO_PROBE_ADDRESS || msg.address == XINFO_PROBE_ADDRESS {
        return vec![identity(&msg.address)];
    }

    let Ok(mut params) = params.lock() else {
        return Vec::new();
    };

    if msg.is_query() {
        return params
            .get(&msg.address)
            .map(|args| vec![Message::new(msg.address.clone(), args.clone())])
            .unwrap_or_default();
    }

    params.insert(msg.address.clone(), msg.args.clone());
    Vec::new()
}

fn identity(address: &str) -> Message {
    Message::new(
        address,
        vec![
            Argument::from("V2.07"),
            Argument::from("osc-server"),
            Argument::from("EMULATOR"),
            Argument::from(env!("CARGO_PKG_VERSION")),
        ],
    )
}

#[cfg(test)]
mod tests {
    use oscprims_frame::encode;

    use super::*;

    fn roundtrip(console: &ConsoleEmulator, frame: &[u8]) -> Option<Message> {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_millis(300)))
            .unwrap();
        client.send_to(frame, console.addr()).unwrap();
        let mut buf = [0u8; 512];
        client
            .recv_from(&mut buf)
            .ok()
            .map(|(len, _)| decode(&buf[..len]).unwrap())
    }

    #[test]
    fn stores_and_answers() {
        let console = ConsoleEmulator::spawn().unwrap();
        let set = encode("/ch/03/mix/on", "i", &[Argument::Int(1)]).unwrap();
        assert!(roundtrip(&console, &set).is_none());
        assert_eq!(console.get("/ch/03/mix/on"), Some(vec![Argument::Int(1)]));

        let query = encode("/ch/03/mix/on", "", &[]).unwrap();
        let reply = roundtrip(&console, &query).unwrap();
        assert_eq!(reply.args, vec![Argument::Int(1)]);
        assert_eq!(console.received(), 2);
    }

    #[test]
    fn muted_console_is_silent() {
        let console = ConsoleEmulator::spawn().unwrap();
        console.set_muted(true);
        let query = encode("/info", "", &[]).unwrap();
        assert!(roundtrip(&console, &query).is_none());
    }

    #[test]
    fn bind_on_explicit_address() {
        let console = ConsoleEmulator::bind(("127.0.0.1", 0)).unwrap();
        assert!(console.addr().ip().is_loopback());
        let query = encode("/xinfo", "", &[]).unwrap();
        assert_eq!(roundtrip(&console, &query).unwrap().type_tags(), "ssss");
    }

    #[test]
    fn custom_responder() {
        let console = ConsoleEmulator::spawn_with(|msg| {
            vec![Message::new(msg.address.clone(), vec![Argument::Int(42)])]
        })
        .unwrap();
        let query = encode("/anything", "", &[]).unwrap();
        assert_eq!(roundtrip(&console, &query).unwrap().args, vec![Argument::Int(42)]);
    }
}
