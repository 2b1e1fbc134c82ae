//! Address-routed, type-tagged message codec for mixing console control.
//!
//! Every message is one datagram made of three 4-byte aligned sections:
//! - A NUL-padded address such as `/ch/01/mix/fader`
//! - A `,`-prefixed type tag string (`i`, `f`, `s`), NUL-padded
//! - The argument payloads in tag order
//!
//! Integers and floats travel big-endian. Decoding works on slices only and
//! never reads past the datagram it was given.

pub mod codec;
pub mod error;
pub mod message;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode, encode, encode_message, padded_len, printable, FrameConfig, ALIGNMENT,
    DEFAULT_MAX_FRAME, TAG_DELIMITER,
};
pub use error::{FrameError, Result};
pub use message::{tag_name, type_tags, Argument, Message, TAG_FLOAT, TAG_INT, TAG_TEXT};

#[cfg(feature = "async")]
pub use async_codec::OscCodec;
