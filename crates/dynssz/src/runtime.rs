//! Support routines called by generated code.
//!
//! The code generator emits straight-line field handling but leans on these
//! small helpers for the fiddly shared pieces: offset tables, bitlist
//! sentinels, and length checks. They are public API so generated sources
//! compile against `dynssz` alone.

use crate::descriptor::BYTES_PER_LENGTH_OFFSET;
use crate::error::SszError;
use crate::value::BitSeq;

/// Reads one 4-byte little-endian offset at `pos`.
pub fn read_offset(buf: &[u8], pos: usize) -> Result<usize, SszError> {
    let end = pos + BYTES_PER_LENGTH_OFFSET;
    if buf.len() < end {
        return Err(SszError::UnexpectedEof {
            needed: end,
            available: buf.len(),
        });
    }
    Ok(u32::from_le_bytes(buf[pos..end].try_into().expect("slice is 4 bytes")) as usize)
}

/// Patches the offset slot at `slot` with `offset`.
pub fn write_offset(buf: &mut [u8], slot: usize, offset: usize) -> Result<(), SszError> {
    let offset = u32::try_from(offset).map_err(|_| SszError::OffsetOutOfBounds(offset))?;
    buf[slot..slot + BYTES_PER_LENGTH_OFFSET].copy_from_slice(&offset.to_le_bytes());
    Ok(())
}

/// Validates an offset table against a fixed head and a total length.
pub fn validate_offsets(offsets: &[usize], head: usize, len: usize) -> Result<(), SszError> {
    for (i, &offset) in offsets.iter().enumerate() {
        if i == 0 && offset < head {
            return Err(SszError::OffsetIntoFixedPortion(offset));
        }
        if i > 0 && offset < offsets[i - 1] {
            return Err(SszError::OffsetsAreDecreasing(offset));
        }
        if offset > len {
            return Err(SszError::OffsetOutOfBounds(offset));
        }
    }
    Ok(())
}

/// Splits a dynamic-element list body into per-element slices.
///
/// The first offset fixes the element count; `limit` bounds it.
pub fn subdivide_list<'a>(
    buf: &'a [u8],
    limit: Option<usize>,
) -> Result<Vec<&'a [u8]>, SszError> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }
    let first = read_offset(buf, 0)?;
    if first % BYTES_PER_LENGTH_OFFSET != 0 || first == 0 {
        return Err(SszError::InvalidListPrefix(first));
    }
    let count = first / BYTES_PER_LENGTH_OFFSET;
    if let Some(limit) = limit {
        if count > limit {
            return Err(SszError::ListTooBig { len: count, limit });
        }
    }
    subdivide(buf, count, first)
}

/// Splits a dynamic-element vector body into exactly `count` slices.
pub fn subdivide_vector<'a>(buf: &'a [u8], count: usize) -> Result<Vec<&'a [u8]>, SszError> {
    subdivide(buf, count, count * BYTES_PER_LENGTH_OFFSET)
}

fn subdivide<'a>(buf: &'a [u8], count: usize, head: usize) -> Result<Vec<&'a [u8]>, SszError> {
    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        offsets.push(read_offset(buf, i * BYTES_PER_LENGTH_OFFSET)?);
    }
    validate_offsets(&offsets, head, buf.len())?;
    let mut parts = Vec::with_capacity(count);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(buf.len());
        parts.push(&buf[start..end]);
    }
    Ok(parts)
}

/// Appends a bitlist body (data bits plus sentinel).
pub fn append_bitlist(bits: &BitSeq, buf: &mut Vec<u8>) {
    let bit_len = bits.len();
    let out_len = (bit_len + 1).div_ceil(8);
    let start = buf.len();
    buf.extend(std::iter::repeat_n(0u8, out_len));
    buf[start..start + bits.as_bytes().len()].copy_from_slice(bits.as_bytes());
    buf[start + bit_len / 8] |= 1 << (bit_len % 8);
}

/// Decodes a bitlist body, enforcing `limit` when given.
pub fn parse_bitlist(buf: &[u8], limit: Option<usize>) -> Result<BitSeq, SszError> {
    if buf.is_empty() {
        return Err(SszError::UnexpectedEof {
            needed: 1,
            available: 0,
        });
    }
    let last = *buf.last().expect("buffer is non-empty");
    if last == 0 {
        return Err(SszError::MissingLengthInformation);
    }
    let sentinel = 7 - last.leading_zeros() as usize;
    let len = (buf.len() - 1) * 8 + sentinel;
    if let Some(limit) = limit {
        if len > limit {
            return Err(SszError::ListTooBig { len, limit });
        }
    }
    let mut bytes = buf[..len.div_ceil(8)].to_vec();
    if len % 8 != 0 {
        let last_byte = bytes.last_mut().expect("len > 0 implies data bytes");
        *last_byte &= (1u8 << (len % 8)) - 1;
    }
    BitSeq::from_bytes(bytes, len)
}

/// Appends a payload zero-padded to a fixed width (fixed-size strings).
pub fn append_padded(payload: &[u8], width: usize, buf: &mut Vec<u8>) -> Result<(), SszError> {
    if payload.len() > width {
        return Err(SszError::LengthMismatch {
            len: payload.len(),
            expected: width,
        });
    }
    buf.extend_from_slice(payload);
    buf.extend(std::iter::repeat_n(0u8, width - payload.len()));
    Ok(())
}

/// Decodes a fixed-width string, trimming the zero padding.
pub fn parse_padded_string(buf: &[u8], width: usize) -> Result<String, SszError> {
    check_bytes(buf, width)?;
    let end = buf.iter().rposition(|byte| *byte != 0).map_or(0, |pos| pos + 1);
    parse_string(&buf[..end])
}

/// Decodes a UTF-8 string payload.
pub fn parse_string(buf: &[u8]) -> Result<String, SszError> {
    std::str::from_utf8(buf)
        .map(str::to_string)
        .map_err(|_| SszError::UnsupportedKind("non-utf8 string payload".to_string()))
}

/// Element count of a packed static-element list body.
pub fn packed_count(buf: &[u8], elem_size: usize, limit: Option<usize>) -> Result<usize, SszError> {
    if elem_size == 0 || buf.len() % elem_size != 0 {
        return Err(SszError::InvalidByteLength {
            len: buf.len(),
            expected: buf.len().next_multiple_of(elem_size.max(1)),
        });
    }
    let count = buf.len() / elem_size;
    check_limit(count, limit)?;
    Ok(count)
}

/// Slices `len` bytes at `pos`, EOF-checked.
pub fn take(buf: &[u8], pos: usize, len: usize) -> Result<&[u8], SszError> {
    let end = pos + len;
    if buf.len() < end {
        return Err(SszError::UnexpectedEof {
            needed: end,
            available: buf.len(),
        });
    }
    Ok(&buf[pos..end])
}

/// Checks that a container buffer covers its fixed head.
pub fn check_head(buf: &[u8], head: usize) -> Result<(), SszError> {
    if buf.len() < head {
        Err(SszError::UnexpectedEof {
            needed: head,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

/// Checks an exact element count.
pub fn check_length(len: usize, expected: usize) -> Result<(), SszError> {
    crate::size::check_length(len, expected)
}

/// Checks a list bound.
pub fn check_limit(len: usize, limit: Option<usize>) -> Result<(), SszError> {
    crate::size::check_limit(len, limit)
}

/// Checks an exact buffer length.
pub fn check_bytes(buf: &[u8], expected: usize) -> Result<(), SszError> {
    if buf.len() < expected {
        Err(SszError::UnexpectedEof {
            needed: expected,
            available: buf.len(),
        })
    } else if buf.len() > expected {
        Err(SszError::InvalidByteLength {
            len: buf.len(),
            expected,
        })
    } else {
        Ok(())
    }
}

/// Decodes one strict boolean byte.
pub fn parse_bool(buf: &[u8]) -> Result<bool, SszError> {
    check_bytes(buf, 1)?;
    match buf[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SszError::InvalidBoolean(other)),
    }
}
