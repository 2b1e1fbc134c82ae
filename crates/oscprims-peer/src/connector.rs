use tracing::debug;

use crate::connection::{Connection, ConnectionConfig};
use crate::error::Result;
use crate::handshake::handshake_error;

/// Connect to the console at `host:port` with default configuration.
///
/// Fails with [`PeerError::Handshake`] unless the console confirms.
pub fn connect(host: &str, port: u16) -> Result<Connection> {
    connect_with_config(host, port, ConnectionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(host: &str, port: u16, config: ConnectionConfig) -> Result<Connection> {
    let mut conn = Connection::with_config(host, port, config)?;
    let outcome = conn.connect();
    if outcome.is_confirmed() {
        debug!(host, port, "connected");
        return Ok(conn);
    }
    Err(handshake_error(outcome, conn.last_error()))
}
