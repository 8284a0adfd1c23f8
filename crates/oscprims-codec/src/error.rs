/// Errors that can occur while encoding or decoding OSC packets.
///
/// Every variant is scoped to a single packet: a failed encode aborts that
/// send only, a failed decode drops that datagram only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// A native value could not be mapped onto an OSC argument.
    #[error("cannot encode {value}: {reason}")]
    Encoding { value: String, reason: String },

    /// An OSC address must start with `/`.
    #[error("invalid OSC address {0:?} (must start with '/')")]
    InvalidAddress(String),

    /// The type-tag string names a type this codec does not know.
    #[error("unknown type tag {tag:?}")]
    UnknownTypeTag { tag: char },

    /// The buffer claims to be a bundle but the `#bundle` marker is wrong.
    #[error("invalid bundle marker (expected \"#bundle\\0\")")]
    InvalidBundleMarker,

    /// A string field is not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidString { offset: usize },

    /// The packet is structurally wrong (e.g. type tags without a leading `,`).
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A field extends past the end of the buffer.
    #[error("truncated packet: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

impl CodecError {
    pub(crate) fn encoding(value: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::Encoding {
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while building a packet for the wire.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding { .. } | Self::InvalidAddress(_))
    }

    /// True for errors raised while reading a packet off the wire.
    pub fn is_decoding(&self) -> bool {
        !self.is_encoding()
    }

    /// True when the buffer ended before a field was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_error_names_value() {
        let err = CodecError::encoding("{\"a\":1}", "unsupported value");
        assert_eq!(err.to_string(), "cannot encode {\"a\":1}: unsupported value");
        assert!(err.is_encoding());
        assert!(!err.is_decoding());
    }

    #[test]
    fn unknown_tag_names_tag() {
        let err = CodecError::UnknownTypeTag { tag: 'x' };
        assert_eq!(err.to_string(), "unknown type tag 'x'");
        assert!(err.is_decoding());
    }

    #[test]
    fn truncated_display() {
        let err = CodecError::Truncated {
            offset: 8,
            needed: 4,
            available: 2,
        };
        assert!(err.is_truncated());
        assert_eq!(
            err.to_string(),
            "truncated packet: need 4 bytes at offset 8, 2 available"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CodecError>();
    }
}
