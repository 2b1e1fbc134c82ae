//! Typed arguments and the messages that carry them.
//!
//! Every argument has a one-character type tag. A message's tag string is
//! derived from its arguments, so the tag count always equals the argument
//! count.

use std::fmt;

/// Type tag for a signed 32-bit integer argument.
pub const TAG_INT: u8 = b'i';

/// Type tag for an IEEE-754 32-bit float argument.
pub const TAG_FLOAT: u8 = b'f';

/// Type tag for a NUL-terminated text argument.
pub const TAG_TEXT: u8 = b's';

/// Returns a human-readable name for a type tag.
pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        TAG_INT => "int32",
        TAG_FLOAT => "float32",
        TAG_TEXT => "text",
        _ => "unknown",
    }
}

/// The type tag string for `args`, one character per argument.
pub fn type_tags(args: &[Argument]) -> String {
    args.iter().map(|arg| char::from(arg.tag())).collect()
}

/// One typed message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Signed 32-bit integer, host order on this side of the codec.
    Int(i32),
    /// IEEE-754 single-precision float.
    Float(f32),
    /// Text without embedded NUL bytes.
    Text(String),
}

impl Argument {
    /// The wire tag character for this argument.
    pub fn tag(&self) -> u8 {
        match self {
            Argument::Int(_) => TAG_INT,
            Argument::Float(_) => TAG_FLOAT,
            Argument::Text(_) => TAG_TEXT,
        }
    }

    /// Number of payload bytes this argument occupies on the wire.
    pub fn wire_size(&self) -> usize {
        match self {
            Argument::Int(_) | Argument::Float(_) => 4,
            Argument::Text(text) => crate::codec::padded_len(text.len() + 1),
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Argument::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(value)
    }
}

impl From<f32> for Argument {
    fn from(value: f32) -> Self {
        Argument::Float(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Text(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::Text(value)
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(value) => write!(f, "{value}"),
            Argument::Float(value) => write!(f, "{value}"),
            Argument::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// An addressed message: the unit carried by one datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Slash-delimited parameter or command address.
    pub address: String,
    /// Arguments in wire order.
    pub args: Vec<Argument>,
}

impl Message {
    /// Create a message with arguments.
    pub fn new(address: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Create a no-argument message (a query).
    pub fn query(address: impl Into<String>) -> Self {
        Self::new(address, Vec::new())
    }

    /// The type tag string, one character per argument.
    pub fn type_tags(&self) -> String {
        type_tags(&self.args)
    }

    /// True when the message carries no arguments.
    pub fn is_query(&self) -> bool {
        self.args.is_empty()
    }

    /// First argument, if any.
    pub fn first(&self) -> Option<&Argument> {
        self.args.first()
    }

    /// The total wire size of this message once encoded.
    pub fn wire_size(&self) -> usize {
        crate::codec::padded_len(self.address.len() + 1)
            + crate::codec::padded_len(self.args.len() + 2)
            + self.args.iter().map(Argument::wire_size).sum::<usize>()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ,{}", self.address, self.type_tags())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
