use std::net::SocketAddr;

use oscprims_codec::CodecError;

/// Errors that can occur in OSC transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local UDP socket.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to resolve a `host:port` remote address.
    #[error("failed to resolve {target}: {source}")]
    Resolve {
        target: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the socket.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The packet could not be encoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The session was torn down; its socket is closed.
    #[error("session closed")]
    Closed,

    /// No session is currently connected.
    #[error("not connected")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;
