//! Buffer-backed unmarshaling with strict offset validation.

use dynssz_primitives::{U128, U256};

use crate::codec::EngineCtx;
use crate::descriptor::{
    BYTES_PER_LENGTH_OFFSET, ContainerDescriptor, DescriptorKind, TypeDescriptor, UintKind,
};
use crate::error::SszError;
use crate::size::check_limit;
use crate::value::{BitSeq, Value};

/// Decodes a value of `desc` from exactly `buf`.
pub(crate) fn decode_value(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    buf: &[u8],
) -> Result<Value, SszError> {
    if let Some(codec) = desc.fast_path() {
        if !ctx.no_fast_path {
            return codec.decode(buf);
        }
    }
    match &desc.kind {
        DescriptorKind::Bool => {
            let byte = exact(buf, 1)?[0];
            match byte {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(SszError::InvalidBoolean(other)),
            }
        }
        DescriptorKind::Uint(uint) => decode_uint(*uint, buf),
        DescriptorKind::Vector { elem, length } => decode_vector(ctx, desc, elem, *length, buf),
        DescriptorKind::List { elem, limit } => decode_list(ctx, desc, elem, *limit, buf),
        DescriptorKind::ProgressiveList { elem } => decode_list(ctx, desc, elem, None, buf),
        DescriptorKind::Bitvector { bits } => {
            let bytes = exact(buf, bits.div_ceil(8))?;
            Ok(Value::Bits(BitSeq::from_bytes(bytes.to_vec(), *bits)?))
        }
        DescriptorKind::Bitlist { limit } => decode_bitlist(buf, *limit),
        DescriptorKind::ProgressiveBitlist => decode_bitlist(buf, None),
        DescriptorKind::Container(container) | DescriptorKind::ProgressiveContainer(container) => {
            decode_container(ctx, container, buf)
        }
        DescriptorKind::Union { variants } => {
            if buf.is_empty() {
                return Err(SszError::UnexpectedEof {
                    needed: 1,
                    available: 0,
                });
            }
            let selector = buf[0];
            let variant =
                variants
                    .get(selector as usize)
                    .ok_or(SszError::InvalidUnionVariant {
                        selector,
                        variants: variants.len(),
                    })?;
            let value = decode_value(ctx, &variant.desc, &buf[1..])?;
            Ok(Value::Union {
                selector,
                value: Box::new(value),
            })
        }
        DescriptorKind::Wrapper { inner } => decode_value(ctx, inner, buf),
        DescriptorKind::Custom => desc
            .codec_override
            .as_ref()
            .ok_or_else(|| SszError::UnsupportedKind("custom type without codec".to_string()))?
            .decode(buf),
    }
}

fn exact(buf: &[u8], len: usize) -> Result<&[u8], SszError> {
    if buf.len() < len {
        return Err(SszError::UnexpectedEof {
            needed: len,
            available: buf.len(),
        });
    }
    if buf.len() > len {
        return Err(SszError::InvalidByteLength {
            len: buf.len(),
            expected: len,
        });
    }
    Ok(buf)
}

fn decode_uint(uint: UintKind, buf: &[u8]) -> Result<Value, SszError> {
    let bytes = exact(buf, uint.byte_len())?;
    Ok(match uint {
        UintKind::U8 => Value::U8(bytes[0]),
        UintKind::U16 => Value::U16(u16::from_le_bytes(bytes.try_into().expect("len checked"))),
        UintKind::U32 => Value::U32(u32::from_le_bytes(bytes.try_into().expect("len checked"))),
        UintKind::U64 => Value::U64(u64::from_le_bytes(bytes.try_into().expect("len checked"))),
        UintKind::U128 => Value::U128(U128::from_le_bytes::<16>(
            bytes.try_into().expect("len checked"),
        )),
        UintKind::U256 => Value::U256(U256::from_le_bytes::<32>(
            bytes.try_into().expect("len checked"),
        )),
    })
}

fn decode_byte_payload(desc: &TypeDescriptor, bytes: &[u8], fixed: bool) -> Result<Value, SszError> {
    if desc.is_string {
        let trimmed = if fixed {
            // Fixed-size strings are zero-padded on the wire.
            let end = bytes
                .iter()
                .rposition(|byte| *byte != 0)
                .map_or(0, |pos| pos + 1);
            &bytes[..end]
        } else {
            bytes
        };
        let text = std::str::from_utf8(trimmed)
            .map_err(|_| SszError::UnsupportedKind("non-utf8 string payload".to_string()))?;
        Ok(Value::Str(text.to_string()))
    } else {
        Ok(Value::Bytes(bytes.to_vec()))
    }
}

fn decode_vector(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    elem: &TypeDescriptor,
    length: usize,
    buf: &[u8],
) -> Result<Value, SszError> {
    if desc.is_byte_seq {
        return decode_byte_payload(desc, exact(buf, length)?, true);
    }
    if let Some(elem_size) = elem.static_size {
        let bytes = exact(buf, length * elem_size)?;
        let mut items = Vec::with_capacity(length);
        for chunk in bytes.chunks(elem_size.max(1)).take(length) {
            items.push(decode_value(ctx, elem, chunk)?);
        }
        return Ok(Value::Seq(items));
    }
    // Dynamic elements are located through an offset table covering the
    // whole head.
    let offsets = read_offset_table(buf, length, length * BYTES_PER_LENGTH_OFFSET)?;
    decode_dynamic_elements(ctx, elem, buf, &offsets)
}

fn decode_list(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    elem: &TypeDescriptor,
    limit: Option<usize>,
    buf: &[u8],
) -> Result<Value, SszError> {
    if desc.is_byte_seq {
        check_limit(buf.len(), limit)?;
        return decode_byte_payload(desc, buf, false);
    }
    if buf.is_empty() {
        return Ok(Value::Seq(Vec::new()));
    }
    if let Some(elem_size) = elem.static_size {
        if buf.len() % elem_size != 0 {
            return Err(SszError::InvalidByteLength {
                len: buf.len(),
                expected: buf.len().next_multiple_of(elem_size),
            });
        }
        let count = buf.len() / elem_size;
        check_limit(count, limit)?;
        let mut items = Vec::with_capacity(count);
        for chunk in buf.chunks(elem_size) {
            items.push(decode_value(ctx, elem, chunk)?);
        }
        return Ok(Value::Seq(items));
    }
    // The first offset fixes the element count.
    if buf.len() < BYTES_PER_LENGTH_OFFSET {
        return Err(SszError::UnexpectedEof {
            needed: BYTES_PER_LENGTH_OFFSET,
            available: buf.len(),
        });
    }
    let first = read_offset(buf, 0);
    if first % BYTES_PER_LENGTH_OFFSET != 0 || first == 0 {
        return Err(SszError::InvalidListPrefix(first));
    }
    let count = first / BYTES_PER_LENGTH_OFFSET;
    check_limit(count, limit)?;
    let offsets = read_offset_table(buf, count, first)?;
    decode_dynamic_elements(ctx, elem, buf, &offsets)
}

/// Reads and validates `count` offsets against a fixed head of `head` bytes.
///
/// Enforces the offset rules: the table fits, the first offset does not
/// point into the head, offsets never decrease, and none exceeds the buffer.
fn read_offset_table(buf: &[u8], count: usize, head: usize) -> Result<Vec<usize>, SszError> {
    if buf.len() < count * BYTES_PER_LENGTH_OFFSET {
        return Err(SszError::UnexpectedEof {
            needed: count * BYTES_PER_LENGTH_OFFSET,
            available: buf.len(),
        });
    }
    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        let offset = read_offset(buf, i * BYTES_PER_LENGTH_OFFSET);
        if i == 0 && offset < head {
            return Err(SszError::OffsetIntoFixedPortion(offset));
        }
        if let Some(&prev) = offsets.last() {
            if offset < prev {
                return Err(SszError::OffsetsAreDecreasing(offset));
            }
        }
        if offset > buf.len() {
            return Err(SszError::OffsetOutOfBounds(offset));
        }
        offsets.push(offset);
    }
    Ok(offsets)
}

fn read_offset(buf: &[u8], pos: usize) -> usize {
    u32::from_le_bytes(
        buf[pos..pos + BYTES_PER_LENGTH_OFFSET]
            .try_into()
            .expect("offset slice is 4 bytes"),
    ) as usize
}

fn decode_dynamic_elements(
    ctx: &EngineCtx,
    elem: &TypeDescriptor,
    buf: &[u8],
    offsets: &[usize],
) -> Result<Value, SszError> {
    let mut items = Vec::with_capacity(offsets.len());
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(buf.len());
        items.push(decode_value(ctx, elem, &buf[start..end])?);
    }
    Ok(Value::Seq(items))
}

fn decode_bitlist(buf: &[u8], limit: Option<usize>) -> Result<Value, SszError> {
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
    check_limit(len, limit)?;
    let mut bytes = buf[..len.div_ceil(8)].to_vec();
    if len % 8 != 0 {
        // The sentinel shares the final data byte; strip it.
        let last_byte = bytes.last_mut().expect("len > 0 implies data bytes");
        *last_byte &= (1u8 << (len % 8)) - 1;
    }
    Ok(Value::Bits(BitSeq::from_bytes(bytes, len)?))
}

/// The three-phase container read: fixed head, offset validation, tail
/// slicing.
fn decode_container(
    ctx: &EngineCtx,
    container: &ContainerDescriptor,
    buf: &[u8],
) -> Result<Value, SszError> {
    // HEAD
    if buf.len() < container.fixed_head {
        return Err(SszError::UnexpectedEof {
            needed: container.fixed_head,
            available: buf.len(),
        });
    }
    let dynamic_count = container
        .fields
        .iter()
        .filter(|field| field.is_dynamic())
        .count();
    if dynamic_count == 0 && buf.len() != container.fixed_head {
        return Err(SszError::InvalidByteLength {
            len: buf.len(),
            expected: container.fixed_head,
        });
    }

    let mut head_pos = 0;
    let mut offsets = Vec::with_capacity(dynamic_count);
    for field in &container.fields {
        match field.desc.static_size {
            Some(size) => head_pos += size,
            None => {
                offsets.push(read_offset(buf, head_pos));
                head_pos += BYTES_PER_LENGTH_OFFSET;
            }
        }
    }

    // VALIDATE_OFFSETS
    for (i, &offset) in offsets.iter().enumerate() {
        if i == 0 && offset < container.fixed_head {
            return Err(SszError::OffsetIntoFixedPortion(offset));
        }
        if i > 0 && offset < offsets[i - 1] {
            return Err(SszError::OffsetsAreDecreasing(offset));
        }
        if offset > buf.len() {
            return Err(SszError::OffsetOutOfBounds(offset));
        }
    }

    // TAIL
    let mut values = Vec::with_capacity(container.fields.len());
    let mut head_pos = 0;
    let mut dynamic_index = 0;
    for field in &container.fields {
        match field.desc.static_size {
            Some(size) => {
                values.push(decode_value(ctx, &field.desc, &buf[head_pos..head_pos + size])?);
                head_pos += size;
            }
            None => {
                let start = offsets[dynamic_index];
                let end = offsets
                    .get(dynamic_index + 1)
                    .copied()
                    .unwrap_or(buf.len());
                values.push(decode_value(ctx, &field.desc, &buf[start..end])?);
                head_pos += BYTES_PER_LENGTH_OFFSET;
                dynamic_index += 1;
            }
        }
    }
    Ok(Value::Container(values))
}
