//! Open Sound Control (OSC 1.0) binary codec.
//!
//! Pure functions over byte buffers, no I/O. Every packet is either:
//! - a message: padded address, padded `,`-prefixed type tags, argument payloads
//! - a bundle: `"#bundle\0"`, an NTP time tag, then length-prefixed elements
//!
//! [`to_buffer`] and [`from_buffer`] are the only encode/decode entry points;
//! [`decode`] additionally strips type tags into the [`Decoded`] form.

pub mod bundle;
pub mod error;
pub mod message;
pub mod packet;
pub mod primitive;
pub mod timetag;
pub mod value;

pub use bundle::{
    decode_bundle, encode_bundle, is_bundle, Bundle, BUNDLE_MARKER, MAX_BUNDLE_DEPTH,
};
pub use error::{CodecError, Result};
pub use message::{decode_message, encode_message, Message};
pub use packet::{
    decode, encode_packet, from_buffer, to_buffer, Decoded, DecodedBundle, FlatMessage, Packet,
};
pub use timetag::{TimeTag, NTP_UNIX_OFFSET};
pub use value::{Argument, MidiMessage, PlainValue};
