//! Fixed-width and padded primitives of the OSC wire format.
//!
//! All numeric fields are big-endian. Strings and blobs end on a 4-byte
//! boundary. Readers take `(buf, offset)` and return the value together with
//! the offset just past it; every read is bounds-checked against `buf.len()`.

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};

/// Alignment of every OSC field.
pub const ALIGNMENT: usize = 4;

/// Round `len` up to the next multiple of [`ALIGNMENT`].
pub fn padded_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Borrow `len` bytes at `offset`, failing with [`CodecError::Truncated`]
/// instead of reading past the end of `buf`.
pub fn read_slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let available = buf.len().saturating_sub(offset);
    if offset > buf.len() || len > available {
        return Err(CodecError::Truncated {
            offset,
            needed: len,
            available,
        });
    }
    Ok(&buf[offset..offset + len])
}

/// Read 4 raw bytes.
pub fn read_array4(buf: &[u8], offset: usize) -> Result<([u8; 4], usize)> {
    let bytes = read_slice(buf, offset, 4)?;
    Ok(([bytes[0], bytes[1], bytes[2], bytes[3]], offset + 4))
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<(u32, usize)> {
    let (raw, next) = read_array4(buf, offset)?;
    Ok((u32::from_be_bytes(raw), next))
}

pub fn read_i32(buf: &[u8], offset: usize) -> Result<(i32, usize)> {
    let (raw, next) = read_array4(buf, offset)?;
    Ok((i32::from_be_bytes(raw), next))
}

pub fn read_f32(buf: &[u8], offset: usize) -> Result<(f32, usize)> {
    let (raw, next) = read_array4(buf, offset)?;
    Ok((f32::from_be_bytes(raw), next))
}

/// Write a string followed by a NUL terminator and zero padding.
///
/// A string that already contains a NUL byte cannot round-trip and is rejected.
pub fn write_string(value: &str, dst: &mut BytesMut) -> Result<()> {
    if value.as_bytes().contains(&0) {
        return Err(CodecError::encoding(
            format!("{value:?}"),
            "string contains a NUL byte",
        ));
    }
    let total = padded_len(value.len() + 1);
    dst.reserve(total);
    dst.put_slice(value.as_bytes());
    dst.put_bytes(0, total - value.len());
    Ok(())
}

/// Read a NUL-terminated string and skip its padding.
pub fn read_string(buf: &[u8], offset: usize) -> Result<(String, usize)> {
    let available = buf.len().saturating_sub(offset);
    let rest = read_slice(buf, offset, available)?;
    let Some(nul) = rest.iter().position(|&b| b == 0) else {
        return Err(CodecError::Truncated {
            offset,
            needed: available + 1,
            available,
        });
    };

    let field_len = padded_len(nul + 1);
    if field_len > available {
        return Err(CodecError::Truncated {
            offset,
            needed: field_len,
            available,
        });
    }

    let text = std::str::from_utf8(&rest[..nul])
        .map_err(|_| CodecError::InvalidString { offset })?;
    Ok((text.to_string(), offset + field_len))
}

/// Write a 4-byte length, the raw bytes, then zero padding.
pub fn write_blob(value: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| {
        CodecError::encoding(
            format!("<blob {} bytes>", value.len()),
            "blob longer than u32::MAX",
        )
    })?;
    let padded = padded_len(value.len());
    dst.reserve(4 + padded);
    dst.put_u32(len);
    dst.put_slice(value);
    dst.put_bytes(0, padded - value.len());
    Ok(())
}

/// Read a length-prefixed blob and skip its padding.
pub fn read_blob(buf: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let (len, start) = read_u32(buf, offset)?;
    let len = len as usize;
    let padded = len
        .checked_next_multiple_of(ALIGNMENT)
        .ok_or(CodecError::Truncated {
            offset: start,
            needed: len,
            available: buf.len().saturating_sub(start),
        })?;
    read_slice(buf, start, padded)?;
    Ok((&buf[start..start + len], start + padded))
}
