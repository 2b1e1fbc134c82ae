use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode, encode_message, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

/// Datagram codec for use with `tokio_util::udp::UdpFramed`.
///
/// Each datagram is exactly one message, so the decoder consumes the whole
/// buffer it is handed.
#[derive(Debug, Clone, Default)]
pub struct OscCodec {
    config: FrameConfig,
}

impl OscCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for OscCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.is_empty() {
            return Ok(None);
        }
        let datagram = src.split();
        decode(&datagram).map(Some)
    }
}

impl Encoder<Message> for OscCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let size = item.wire_size();
        if size > self.config.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            });
        }
        encode_message(&item, dst)
    }
}
