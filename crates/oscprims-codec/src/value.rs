//! OSC argument types and their mapping to and from native values.
//!
//! [`Argument`] is the tagged form used on the wire. [`PlainValue`] is the
//! untagged form handed to the application after decoding. Dynamic native
//! values (`serde_json::Value`) enter through [`Argument::from_native`].

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::primitive::{
    read_array4, read_blob, read_f32, read_i32, read_string, write_blob, write_string,
};

/// Type tag characters understood by this codec.
pub mod tag {
    pub const INT32: char = 'i';
    pub const FLOAT32: char = 'f';
    pub const STRING: char = 's';
    pub const BLOB: char = 'b';
    pub const TRUE: char = 'T';
    pub const FALSE: char = 'F';
    pub const NIL: char = 'N';
    pub const MIDI: char = 'm';
}

/// A 4-byte MIDI message argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MidiMessage {
    pub port: u8,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub fn new(port: u8, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            port,
            status,
            data1,
            data2,
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.port, self.status, self.data1, self.data2]
    }

    pub fn from_bytes(raw: [u8; 4]) -> Self {
        Self::new(raw[0], raw[1], raw[2], raw[3])
    }
}

/// A single typed OSC argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Bytes),
    True,
    False,
    Nil,
    Midi(MidiMessage),
}

impl Argument {
    /// The type tag character written for this argument.
    pub fn type_tag(&self) -> char {
        match self {
            Self::Int(_) => tag::INT32,
            Self::Float(_) => tag::FLOAT32,
            Self::String(_) => tag::STRING,
            Self::Blob(_) => tag::BLOB,
            Self::True => tag::TRUE,
            Self::False => tag::FALSE,
            Self::Nil => tag::NIL,
            Self::Midi(_) => tag::MIDI,
        }
    }

    /// Append this argument's payload (not its tag) to `dst`.
    pub fn write_payload(&self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Self::Int(v) => dst.put_i32(*v),
            Self::Float(v) => dst.put_f32(*v),
            Self::String(v) => write_string(v, dst)?,
            Self::Blob(v) => write_blob(v, dst)?,
            Self::True | Self::False | Self::Nil => {}
            Self::Midi(v) => dst.put_slice(&v.to_bytes()),
        }
        Ok(())
    }

    /// Decode one payload for `tag` starting at `offset`.
    pub fn read_payload(tag: char, buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        match tag {
            tag::INT32 => read_i32(buf, offset).map(|(v, next)| (Self::Int(v), next)),
            tag::FLOAT32 => read_f32(buf, offset).map(|(v, next)| (Self::Float(v), next)),
            tag::STRING => read_string(buf, offset).map(|(v, next)| (Self::String(v), next)),
            tag::BLOB => read_blob(buf, offset)
                .map(|(v, next)| (Self::Blob(Bytes::copy_from_slice(v)), next)),
            tag::TRUE => Ok((Self::True, offset)),
            tag::FALSE => Ok((Self::False, offset)),
            tag::NIL => Ok((Self::Nil, offset)),
            tag::MIDI => {
                read_array4(buf, offset).map(|(v, next)| (Self::Midi(MidiMessage::from_bytes(v)), next))
            }
            other => Err(CodecError::UnknownTypeTag { tag: other }),
        }
    }

    /// Map a dynamic native value onto an argument.
    ///
    /// Implicit rules: integral numbers become `i`, other numbers `f`,
    /// strings `s`, booleans `T`/`F`, arrays of bytes `b`. An object of the
    /// form `{"type": <tag>, "value": <v>}` forces the tag; `d`/`double` is
    /// accepted but narrowed to a 32-bit float since the wire carries no
    /// float64.
    pub fn from_native(value: &Value) -> Result<Self> {
        match value {
            Value::Number(_) => number_argument(value),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Bool(b) => Ok(Self::from(*b)),
            Value::Array(items) => byte_array(value, items).map(Self::Blob),
            Value::Object(fields) => match fields.get("type").and_then(Value::as_str) {
                Some(tag) => explicit_argument(tag, fields.get("value").unwrap_or(&Value::Null), value),
                None => Err(CodecError::encoding(value, "object has no recognized \"type\" tag")),
            },
            Value::Null => Err(CodecError::encoding(value, "null has no implicit OSC type")),
        }
    }

    /// Strip the tag, leaving the value the application sees.
    pub fn into_plain(self) -> PlainValue {
        match self {
            Self::Int(v) => PlainValue::Int(v),
            Self::Float(v) => PlainValue::Float(v),
            Self::String(v) => PlainValue::String(v),
            Self::Blob(v) => PlainValue::Blob(v),
            Self::True => PlainValue::Bool(true),
            Self::False => PlainValue::Bool(false),
            Self::Nil => PlainValue::Nil,
            Self::Midi(v) => PlainValue::Midi(v),
        }
    }
}

fn number_argument(value: &Value) -> Result<Argument> {
    if let Some(int) = value.as_i64() {
        return i32::try_from(int)
            .map(Argument::Int)
            .map_err(|_| CodecError::encoding(value, "integer outside int32 range"));
    }
    if value.is_u64() {
        return Err(CodecError::encoding(value, "integer outside int32 range"));
    }
    value
        .as_f64()
        .map(|f| Argument::Float(f as f32))
        .ok_or_else(|| CodecError::encoding(value, "not a representable number"))
}

fn byte_array(original: &Value, items: &[Value]) -> Result<Bytes> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()
        .map(Bytes::from)
        .ok_or_else(|| CodecError::encoding(original, "arrays are only encoded as blobs of bytes 0-255"))
}

fn explicit_argument(tag: &str, inner: &Value, original: &Value) -> Result<Argument> {
    match tag {
        "i" | "integer" => match inner.as_f64() {
            Some(f) if f.is_finite() && f >= i32::MIN as f64 && f <= i32::MAX as f64 => {
                Ok(Argument::Int(f as i32))
            }
            _ => Err(CodecError::encoding(original, "value is not an int32")),
        },
        "f" | "float" | "d" | "double" => inner
            .as_f64()
            .map(|f| Argument::Float(f as f32))
            .ok_or_else(|| CodecError::encoding(original, "value is not a number")),
        "s" | "string" => match inner {
            Value::String(s) => Ok(Argument::String(s.clone())),
            Value::Number(n) => Ok(Argument::String(n.to_string())),
            Value::Bool(b) => Ok(Argument::String(b.to_string())),
            _ => Err(CodecError::encoding(original, "value is not a string")),
        },
        "b" | "blob" => match inner {
            Value::String(s) => Ok(Argument::Blob(Bytes::from(s.clone().into_bytes()))),
            Value::Array(items) => byte_array(original, items).map(Argument::Blob),
            _ => Err(CodecError::encoding(original, "value is not a byte sequence")),
        },
        "T" | "true" => Ok(Argument::True),
        "F" | "false" => Ok(Argument::False),
        "bool" | "boolean" => inner
            .as_bool()
            .map(Argument::from)
            .ok_or_else(|| CodecError::encoding(original, "value is not a boolean")),
        "m" | "midi" => midi_argument(inner, original),
        other => Err(CodecError::encoding(original, format!("unsupported type tag {other:?}"))),
    }
}

fn midi_argument(inner: &Value, original: &Value) -> Result<Argument> {
    let field = |name: &str| -> Result<u8> {
        match inner.get(name) {
            None | Some(Value::Null) => Ok(0),
            Some(v) => v
                .as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| CodecError::encoding(original, format!("midi {name} is not a byte"))),
        }
    };
    match inner {
        Value::Array(items) => {
            let raw = byte_array(original, items)?;
            let raw: [u8; 4] = raw
                .as_ref()
                .try_into()
                .map_err(|_| CodecError::encoding(original, "midi value must be exactly 4 bytes"))?;
            Ok(Argument::Midi(MidiMessage::from_bytes(raw)))
        }
        Value::Object(_) => Ok(Argument::Midi(MidiMessage::new(
            field("port")?,
            field("status")?,
            field("data1")?,
            field("data2")?,
        ))),
        _ => Err(CodecError::encoding(original, "midi value must be 4 bytes or an object")),
    }
}

impl From<i32> for Argument {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Argument {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

/// Narrowed to `f32`: there is no float64 on the wire.
impl From<f64> for Argument {
    fn from(v: f64) -> Self {
        Self::Float(v as f32)
    }
}

impl From<&str> for Argument {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Argument {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for Argument {
    fn from(v: bool) -> Self {
        if v {
            Self::True
        } else {
            Self::False
        }
    }
}

impl From<Bytes> for Argument {
    fn from(v: Bytes) -> Self {
        Self::Blob(v)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(Bytes::from(v))
    }
}

impl From<MidiMessage> for Argument {
    fn from(v: MidiMessage) -> Self {
        Self::Midi(v)
    }
}

/// A decoded argument with its type tag stripped.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Bytes),
    Bool(bool),
    Nil,
    Midi(MidiMessage),
}

impl PlainValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for PlainValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<f32> for PlainValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for PlainValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl Serialize for PlainValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(v) => serializer.serialize_i32(*v),
            Self::Float(v) => serializer.serialize_f32(*v),
            Self::String(v) => serializer.serialize_str(v),
            Self::Blob(v) => v.as_ref().serialize(serializer),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Nil => serializer.serialize_unit(),
            Self::Midi(v) => v.serialize(serializer),
        }
    }
}
