//! Top-level encode/decode entry points and the sanitized packet form.

use bytes::{Bytes, BytesMut};
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::bundle::{decode_nested_bundle, encode_bundle, is_bundle, Bundle};
use crate::error::Result;
use crate::message::{decode_message, encode_message, Message};
use crate::timetag::TimeTag;
use crate::value::PlainValue;

/// Either a single message or a bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Message(message) => message.encoded_len(),
            Self::Bundle(bundle) => bundle.encoded_len(),
        }
    }

    /// Strip type tags, recursively.
    pub fn into_decoded(self) -> Decoded {
        match self {
            Self::Message(message) => Decoded::Message(FlatMessage {
                address: message.address,
                args: message.args.into_iter().map(|arg| arg.into_plain()).collect(),
            }),
            Self::Bundle(bundle) => Decoded::Bundle(DecodedBundle {
                timetag: bundle.timetag,
                elements: bundle
                    .elements
                    .into_iter()
                    .map(Packet::into_decoded)
                    .collect(),
            }),
        }
    }
}

impl From<Message> for Packet {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Bundle> for Packet {
    fn from(bundle: Bundle) -> Self {
        Self::Bundle(bundle)
    }
}

/// Append the wire form of `packet` to `dst`.
pub fn encode_packet(packet: &Packet, dst: &mut BytesMut) -> Result<()> {
    match packet {
        Packet::Message(message) => encode_message(message, dst),
        Packet::Bundle(bundle) => encode_bundle(bundle, dst),
    }
}

/// Encode a packet into a standalone datagram.
pub fn to_buffer(packet: &Packet) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(packet.encoded_len());
    encode_packet(packet, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode a datagram, choosing the bundle or message decoder by its marker.
pub fn from_buffer(buf: &[u8]) -> Result<Packet> {
    decode_element(buf, 0)
}

/// [`from_buffer`] for a packet sitting inside `depth` enclosing bundles.
pub(crate) fn decode_element(buf: &[u8], depth: usize) -> Result<Packet> {
    if is_bundle(buf) {
        decode_nested_bundle(buf, depth).map(|(bundle, _)| Packet::Bundle(bundle))
    } else {
        decode_message(buf, 0).map(|(message, _)| Packet::Message(message))
    }
}

/// Decode a datagram into the sanitized form delivered to the application.
pub fn decode(buf: &[u8]) -> Result<Decoded> {
    from_buffer(buf).map(Packet::into_decoded)
}

/// A decoded message: its address and untagged arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMessage {
    pub address: String,
    pub args: Vec<PlainValue>,
}

impl FlatMessage {
    /// `[address, arg1, arg2, ...]`.
    pub fn to_flat(&self) -> Vec<PlainValue> {
        std::iter::once(PlainValue::String(self.address.clone()))
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl Serialize for FlatMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.args.len() + 1))?;
        seq.serialize_element(&self.address)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

/// A decoded bundle with sanitized elements.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBundle {
    pub timetag: TimeTag,
    pub elements: Vec<Decoded>,
}

impl Serialize for DecodedBundle {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DecodedBundle", 2)?;
        match self.timetag.as_unix_seconds() {
            Some(seconds) => state.serialize_field("timetag", &seconds)?,
            None => state.serialize_field("timetag", "immediate")?,
        }
        state.serialize_field("elements", &self.elements)?;
        state.end()
    }
}

/// The only packet shape the application sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Decoded {
    Message(FlatMessage),
    Bundle(DecodedBundle),
}

impl Decoded {
    pub fn as_message(&self) -> Option<&FlatMessage> {
        match self {
            Self::Message(message) => Some(message),
            Self::Bundle(_) => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&DecodedBundle> {
        match self {
            Self::Bundle(bundle) => Some(bundle),
            Self::Message(_) => None,
        }
    }
}
