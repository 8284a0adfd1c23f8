use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};
use crate::packet::{decode_element, encode_packet, Packet};
use crate::primitive::{read_slice, read_u32};
use crate::timetag::{read_timetag, write_timetag, TimeTag, TIMETAG_SIZE};

/// Marker bytes opening every bundle: `"#bundle"` plus NUL.
pub const BUNDLE_MARKER: [u8; 8] = *b"#bundle\0";

/// Size of the fixed bundle header (marker + time tag).
pub const BUNDLE_HEADER_SIZE: usize = BUNDLE_MARKER.len() + TIMETAG_SIZE;

/// Deepest bundle nesting accepted on decode. The outermost bundle is level 1.
pub const MAX_BUNDLE_DEPTH: usize = 32;

/// A time-tagged container of messages and nested bundles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bundle {
    pub timetag: TimeTag,
    pub elements: Vec<Packet>,
}

impl Bundle {
    pub fn new(timetag: TimeTag) -> Self {
        Self {
            timetag,
            elements: Vec::new(),
        }
    }

    /// Append one element (builder style).
    pub fn push(mut self, element: impl Into<Packet>) -> Self {
        self.elements.push(element.into());
        self
    }

    pub fn encoded_len(&self) -> usize {
        BUNDLE_HEADER_SIZE
            + self
                .elements
                .iter()
                .map(|element| 4 + element.encoded_len())
                .sum::<usize>()
    }
}

/// True when `buf` opens with the bundle marker.
pub fn is_bundle(buf: &[u8]) -> bool {
    buf.starts_with(&BUNDLE_MARKER)
}

/// Encode a bundle into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬───────────────┬─────┐
/// │ "#bundle\0"  │ Time tag     │ Size (4B BE) │ Element bytes │ ... │
/// │ (8B)         │ (8B NTP)     │              │ (Size bytes)  │     │
/// └──────────────┴──────────────┴──────────────┴───────────────┴─────┘
/// ```
pub fn encode_bundle(bundle: &Bundle, dst: &mut BytesMut) -> Result<()> {
    dst.reserve(bundle.encoded_len());
    dst.put_slice(&BUNDLE_MARKER);
    write_timetag(&bundle.timetag, dst);

    for element in &bundle.elements {
        let size_at = dst.len();
        dst.put_u32(0);
        encode_packet(element, dst)?;
        let size = dst.len() - size_at - 4;
        let size = u32::try_from(size).map_err(|_| {
            CodecError::encoding(
                format!("<bundle element {size} bytes>"),
                "element longer than u32::MAX",
            )
        })?;
        dst[size_at..size_at + 4].copy_from_slice(&size.to_be_bytes());
    }
    Ok(())
}

/// Decode a bundle occupying all of `buf`, returning it with the offset
/// where decoding stopped (always `buf.len()` on success).
///
/// Each element is decoded from its own length-delimited slice; a bad
/// element fails the whole bundle, as does nesting deeper than
/// [`MAX_BUNDLE_DEPTH`].
pub fn decode_bundle(buf: &[u8]) -> Result<(Bundle, usize)> {
    decode_nested_bundle(buf, 0)
}

/// Decode a bundle found inside `depth` enclosing bundles.
pub(crate) fn decode_nested_bundle(buf: &[u8], depth: usize) -> Result<(Bundle, usize)> {
    if depth >= MAX_BUNDLE_DEPTH {
        return Err(CodecError::MalformedPacket(format!(
            "bundles nested deeper than {MAX_BUNDLE_DEPTH} levels"
        )));
    }
    let marker = read_slice(buf, 0, BUNDLE_MARKER.len())?;
    if marker != &BUNDLE_MARKER[..] {
        return Err(CodecError::InvalidBundleMarker);
    }
    let (timetag, mut cursor) = read_timetag(buf, BUNDLE_MARKER.len())?;

    let mut elements = Vec::new();
    while cursor < buf.len() {
        let (size, start) = read_u32(buf, cursor)?;
        let element = read_slice(buf, start, size as usize)?;
        elements.push(decode_element(element, depth + 1)?);
        cursor = start + element.len();
    }

    Ok((Bundle { timetag, elements }, cursor))
}
