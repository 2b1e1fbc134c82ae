use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::message::{Argument, Message, TAG_FLOAT, TAG_INT, TAG_TEXT};

/// Section alignment in bytes. Every section and every frame is a multiple of this.
pub const ALIGNMENT: usize = 4;

/// Delimiter that opens the type tag section.
pub const TAG_DELIMITER: u8 = b',';

/// Default maximum frame size: the console's receive buffer size.
pub const DEFAULT_MAX_FRAME: usize = 512;

/// Round `len` up to the next multiple of [`ALIGNMENT`].
pub const fn padded_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Encode an address, an explicit type tag string and its arguments.
///
/// `type_tags` must list one tag per argument, in order, and every tag must
/// match its argument's variant. The returned buffer owns its bytes.
pub fn encode(address: &str, type_tags: &str, args: &[Argument]) -> Result<Bytes> {
    if type_tags.len() != args.len() {
        return Err(FrameError::InvalidArgument(format!(
            "type tag count {} does not match argument count {}",
            type_tags.len(),
            args.len()
        )));
    }
    for (index, (tag, arg)) in type_tags.bytes().zip(args).enumerate() {
        if tag != arg.tag() {
            return Err(FrameError::InvalidArgument(format!(
                "type tag '{}' at position {index} does not match {} argument",
                char::from(tag),
                crate::message::tag_name(arg.tag())
            )));
        }
    }

    let mut dst = BytesMut::new();
    write_frame(address, args, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────────────┬──────────────────────┐
/// │ Address          │ Type tags                │ Arguments            │
/// │ bytes + NUL,     │ ',' + tags + NUL,        │ i/f: 4B big-endian   │
/// │ 0-pad to 4       │ 0-pad to 4               │ s: bytes + NUL, pad 4│
/// └──────────────────┴──────────────────────────┴──────────────────────┘
/// ```
///
/// Validation runs before anything is appended to `dst`.
pub fn encode_message(msg: &Message, dst: &mut BytesMut) -> Result<()> {
    write_frame(&msg.address, &msg.args, dst)
}

fn write_frame(address: &str, args: &[Argument], dst: &mut BytesMut) -> Result<()> {
    validate(address, args)?;

    let addr_len = padded_len(address.len() + 1);
    let tags_len = padded_len(args.len() + 2);
    let args_len: usize = args.iter().map(Argument::wire_size).sum();

    dst.reserve(addr_len + tags_len + args_len);
    put_padded(dst, address.as_bytes());
    dst.put_u8(TAG_DELIMITER);
    for arg in args {
        dst.put_u8(arg.tag());
    }
    put_zeros(dst, tags_len - args.len() - 1);

    for arg in args {
        match arg {
            Argument::Int(value) => dst.put_i32(*value),
            Argument::Float(value) => dst.put_f32(*value),
            Argument::Text(text) => put_padded(dst, text.as_bytes()),
        }
    }
    Ok(())
}

fn validate(address: &str, args: &[Argument]) -> Result<()> {
    if address.is_empty() {
        return Err(FrameError::InvalidArgument(
            "address must not be empty".to_string(),
        ));
    }
    if address.as_bytes().contains(&0) {
        return Err(FrameError::InvalidArgument(format!(
            "address {address:?} contains a NUL byte"
        )));
    }
    if address.as_bytes().contains(&TAG_DELIMITER) {
        return Err(FrameError::InvalidArgument(format!(
            "address {address:?} contains the tag delimiter ','"
        )));
    }
    for (index, arg) in args.iter().enumerate() {
        if let Argument::Text(text) = arg {
            if text.as_bytes().contains(&0) {
                return Err(FrameError::InvalidArgument(format!(
                    "text argument {index} contains a NUL byte"
                )));
            }
        }
    }
    Ok(())
}

/// Bytes, a NUL terminator, then zero padding to the next boundary.
fn put_padded(dst: &mut BytesMut, bytes: &[u8]) {
    dst.put_slice(bytes);
    put_zeros(dst, padded_len(bytes.len() + 1) - bytes.len());
}

fn put_zeros(dst: &mut BytesMut, count: usize) {
    dst.put_bytes(0, count);
}

/// Decode one datagram into a message.
///
/// A buffer without any `,` byte decodes to a message with no arguments whose
/// address runs up to the first NUL. That is a successful result: consoles
/// answer some queries with a bare address.
///
/// Only the given slice is ever read. Truncated payloads, unknown tags and
/// unterminated strings are reported as [`FrameError::MalformedFrame`].
pub fn decode(buf: &[u8]) -> Result<Message> {
    let Some(comma) = buf.iter().position(|&b| b == TAG_DELIMITER) else {
        tracing::trace!(len = buf.len(), "frame has no type tag section");
        return Ok(Message::query(text_until_nul(buf)));
    };

    let address = text_until_nul(&buf[..comma]);

    let tags_start = comma + 1;
    let tags_len = buf[tags_start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| FrameError::malformed(tags_start, "type tag string is not terminated"))?;
    let tags = &buf[tags_start..tags_start + tags_len];

    let mut cursor = comma + padded_len(tags_len + 2);
    let mut args = Vec::with_capacity(tags.len());

    for &tag in tags {
        match tag {
            TAG_INT => {
                args.push(Argument::Int(i32::from_be_bytes(read_word(buf, cursor)?)));
                cursor += 4;
            }
            TAG_FLOAT => {
                args.push(Argument::Float(f32::from_be_bytes(read_word(buf, cursor)?)));
                cursor += 4;
            }
            TAG_TEXT => {
                let rest = buf.get(cursor..).unwrap_or_default();
                let len = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                    FrameError::malformed(cursor, "text argument is not terminated")
                })?;
                args.push(Argument::Text(
                    String::from_utf8_lossy(&rest[..len]).into_owned(),
                ));
                cursor += padded_len(len + 1);
            }
            other => {
                return Err(FrameError::malformed(
                    tags_start,
                    format!("unsupported type tag '{}'", char::from(other).escape_default()),
                ));
            }
        }
    }

    Ok(Message { address, args })
}

fn read_word(buf: &[u8], offset: usize) -> Result<[u8; 4]> {
    offset
        .checked_add(4)
        .and_then(|end| buf.get(offset..end))
        .and_then(|word| <[u8; 4]>::try_from(word).ok())
        .ok_or_else(|| {
            FrameError::malformed(
                offset,
                format!(
                    "4-byte argument needs {} more bytes",
                    (offset + 4).saturating_sub(buf.len())
                ),
            )
        })
}

fn text_until_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Render a datagram for logs, replacing control bytes with `~`.
pub fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b < b' ' || b >= 0x7f { '~' } else { char::from(b) })
        .collect()
}

/// Configuration for the message codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum encoded frame size in bytes. Default: 512.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}
