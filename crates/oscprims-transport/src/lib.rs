//! Single-endpoint UDP transport with bounded-wait receive.
//!
//! This is the lowest layer of oscprims. A [`UdpTransport`] owns one socket
//! aimed at one remote endpoint and moves raw datagrams:
//! - [`UdpTransport::send`] makes exactly one non-blocking send
//! - [`UdpTransport::recv`] waits up to a [`RecvTimeout`] for one datagram
//!
//! A timeout is reported as [`Received::Timeout`], never as an error.

pub mod error;
pub mod timeout;
pub mod udp;

#[cfg(feature = "async")]
pub mod async_udp;

pub use error::{Result, TransportError};
pub use timeout::RecvTimeout;
pub use udp::{resolve, Received, UdpTransport, MAX_DATAGRAM};

#[cfg(feature = "async")]
pub use async_udp::AsyncUdpTransport;
