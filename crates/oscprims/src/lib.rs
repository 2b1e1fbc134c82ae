//! Mixing console control over UDP.
//!
//! oscprims talks to digital mixing consoles that expose an address-routed,
//! type-tagged message protocol over UDP: encode and decode messages, move
//! them over a single-endpoint socket with bounded waits, and manage a
//! connection with a liveness handshake and typed queries.
//!
//! # Crate Structure
//!
//! - [`transport`]: UDP socket tied to one console, bounded-wait receive
//! - [`frame`]: message codec (address, type tags, big-endian payloads)
//! - [`peer`]: connection, handshake and typed request/response (behind `peer` feature)
//!
//! ```no_run
//! # #[cfg(feature = "peer")]
//! # fn demo() -> oscprims::peer::Result<()> {
//! let mut console = oscprims::peer::connect("192.168.1.62", 10023)?;
//! if let Some(level) = console.query_float("/ch/01/mix/fader")? {
//!     console.command_float("/ch/02/mix/fader", level)?;
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use oscprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use oscprims_frame::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use oscprims_peer::*;
}
