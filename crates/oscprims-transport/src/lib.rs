//! Duplex UDP transport for Open Sound Control.
//!
//! A [`Session`] owns exactly one UDP socket and uses it both to send to a
//! fixed remote device and to receive its replies, so the device sees every
//! request coming from the port it should answer. A [`Link`] owns the
//! current session and swaps it when the remote device changes.
//!
//! Inbound datagrams are decoded with [`oscprims_codec`] and published on an
//! [`EventHub`]: generic [`OscEvent`]s plus per-address channels.

pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod session;

pub use config::{resolve, SessionConfig, MAX_UDP_PAYLOAD};
pub use error::{Result, TransportError};
pub use events::{AddressedMessage, EventHub, OscEvent};
pub use link::Link;
pub use session::{OscSender, Session};
