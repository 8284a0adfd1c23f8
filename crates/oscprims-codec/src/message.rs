use bytes::BytesMut;
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::primitive::{padded_len, read_string, write_string};
use crate::value::Argument;

/// Leading character of every type-tag string.
pub const TYPE_TAG_PREFIX: char = ',';

/// A single OSC message: an address and its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Routing key, always starting with `/`.
    pub address: String,
    pub args: Vec<Argument>,
}

impl Message {
    /// A message with no arguments.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<A, I>(address: impl Into<String>, args: I) -> Self
    where
        A: Into<Argument>,
        I: IntoIterator<Item = A>,
    {
        Self {
            address: address.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append one argument (builder style).
    pub fn arg(mut self, arg: impl Into<Argument>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Build a message from dynamic native values, see [`Argument::from_native`].
    pub fn from_native(address: impl Into<String>, values: &[Value]) -> Result<Self> {
        let args = values
            .iter()
            .map(Argument::from_native)
            .collect::<Result<Vec<_>>>()?;
        let message = Self {
            address: address.into(),
            args,
        };
        message.validate()?;
        Ok(message)
    }

    /// The `,`-prefixed type-tag string for the current arguments.
    pub fn type_tags(&self) -> String {
        std::iter::once(TYPE_TAG_PREFIX)
            .chain(self.args.iter().map(Argument::type_tag))
            .collect()
    }

    /// Check construction invariants before anything touches the wire.
    pub fn validate(&self) -> Result<()> {
        if !self.address.starts_with('/') {
            return Err(CodecError::InvalidAddress(self.address.clone()));
        }
        Ok(())
    }

    /// Exact number of bytes [`encode_message`] will produce.
    pub fn encoded_len(&self) -> usize {
        let args: usize = self
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Int(_) | Argument::Float(_) | Argument::Midi(_) => 4,
                Argument::String(s) => padded_len(s.len() + 1),
                Argument::Blob(b) => 4 + padded_len(b.len()),
                Argument::True | Argument::False | Argument::Nil => 0,
            })
            .sum();
        padded_len(self.address.len() + 1) + padded_len(self.args.len() + 2) + args
    }
}

/// Encode a message into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────┬──────────────────────┬────────────────────────┐
/// │ Address          │ Type tags            │ Argument payloads      │
/// │ "/..." NUL pad4  │ ",..." NUL pad4      │ one per tag, in order  │
/// └──────────────────┴──────────────────────┴────────────────────────┘
/// ```
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<()> {
    message.validate()?;
    dst.reserve(message.encoded_len());
    write_string(&message.address, dst)?;
    write_string(&message.type_tags(), dst)?;
    for arg in &message.args {
        arg.write_payload(dst)?;
    }
    Ok(())
}

/// Decode a message starting at `offset`, returning it with the offset just
/// past its last argument.
///
/// The argument count is implied by the type-tag string alone, so every
/// payload read is bounds-checked and a short buffer yields
/// [`CodecError::Truncated`].
pub fn decode_message(buf: &[u8], offset: usize) -> Result<(Message, usize)> {
    let (address, cursor) = read_string(buf, offset)?;
    if !address.starts_with('/') {
        return Err(CodecError::MalformedPacket(format!(
            "address {address:?} does not start with '/'"
        )));
    }

    let (tags, mut cursor) = read_string(buf, cursor)?;
    let Some(tags) = tags.strip_prefix(TYPE_TAG_PREFIX) else {
        return Err(CodecError::MalformedPacket(format!(
            "type tag string {tags:?} does not start with ','"
        )));
    };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let (arg, next) = Argument::read_payload(tag, buf, cursor)?;
        args.push(arg);
        cursor = next;
    }

    Ok((Message { address, args }, cursor))
}
