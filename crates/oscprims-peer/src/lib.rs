//! Console connection management: liveness handshake and typed requests.
//!
//! This is the "just works" layer. Create a [`Connection`], call
//! [`Connection::connect`] to probe the console, then send commands and
//! queries by address. Replies are matched by address; a console that does
//! not answer within the reply timeout yields `Ok(None)`.

pub mod connection;
pub mod connector;
pub mod emulator;
pub mod error;
pub mod handshake;
mod request;

#[cfg(feature = "async")]
pub mod async_connection;

pub use connection::{
    Connection, ConnectionConfig, ConnectionState, DEFAULT_PORT, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_REPLY_TIMEOUT,
};
pub use connector::{connect, connect_with_config};
pub use emulator::ConsoleEmulator;
pub use error::{PeerError, Result};
pub use handshake::{
    probe, probe_frame, probe_matches, ConnectOutcome, HandshakeResult, INFO_PROBE_ADDRESS,
    XINFO_PROBE_ADDRESS,
};

#[cfg(feature = "async")]
pub use async_connection::AsyncConnection;
#[cfg(feature = "async")]
pub use handshake::probe_async;
