//! Open Sound Control over UDP.
//!
//! oscprims encodes and decodes OSC 1.0 messages and bundles, and runs duplex
//! sessions against networked devices such as digital mixing consoles, which
//! answer the source port of each request.
//!
//! # Crate Structure
//!
//! - [`codec`]: wire format, argument model and the sanitized packet form
//! - [`transport`]: UDP sessions, event fan-out and the link manager (behind `transport` feature)

/// Re-export codec types.
pub mod codec {
    pub use oscprims_codec::*;
}

/// Re-export transport types (requires `transport` feature).
#[cfg(feature = "transport")]
pub mod transport {
    pub use oscprims_transport::*;
}
