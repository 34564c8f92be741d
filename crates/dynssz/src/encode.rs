//! Buffer-backed marshaling.

use crate::codec::EngineCtx;
use crate::descriptor::{
    BYTES_PER_LENGTH_OFFSET, DescriptorKind, TypeDescriptor, UintKind,
};
use crate::error::SszError;
use crate::size::{check_length, check_limit, size_of};
use crate::value::Value;

/// Appends the encoding of `value` under `desc` to `buf`.
pub(crate) fn encode_value(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
    buf: &mut Vec<u8>,
) -> Result<(), SszError> {
    if let Some(codec) = desc.fast_path() {
        if !ctx.no_fast_path {
            return codec.encode(value, buf);
        }
    }
    match &desc.kind {
        DescriptorKind::Bool => {
            buf.push(value.as_bool()? as u8);
            Ok(())
        }
        DescriptorKind::Uint(uint) => encode_uint(*uint, value, buf),
        DescriptorKind::Vector { elem, length } => {
            if desc.is_byte_seq {
                return encode_byte_vector(desc, value, *length, buf);
            }
            let items = value.as_seq()?;
            check_length(items.len(), *length)?;
            encode_sequence(ctx, elem, items, buf)
        }
        DescriptorKind::List { elem, limit } => {
            if desc.is_byte_seq {
                let payload = value.as_byte_payload()?;
                check_limit(payload.len(), *limit)?;
                buf.extend_from_slice(payload);
                return Ok(());
            }
            let items = value.as_seq()?;
            check_limit(items.len(), *limit)?;
            encode_sequence(ctx, elem, items, buf)
        }
        DescriptorKind::ProgressiveList { elem } => {
            if desc.is_byte_seq {
                buf.extend_from_slice(value.as_byte_payload()?);
                return Ok(());
            }
            encode_sequence(ctx, elem, value.as_seq()?, buf)
        }
        DescriptorKind::Bitvector { bits } => {
            let value_bits = value.as_bits()?;
            check_length(value_bits.len(), *bits)?;
            buf.extend_from_slice(value_bits.as_bytes());
            Ok(())
        }
        DescriptorKind::Bitlist { limit } => {
            let value_bits = value.as_bits()?;
            check_limit(value_bits.len(), *limit)?;
            encode_bitlist(value_bits.as_bytes(), value_bits.len(), buf);
            Ok(())
        }
        DescriptorKind::ProgressiveBitlist => {
            let value_bits = value.as_bits()?;
            encode_bitlist(value_bits.as_bytes(), value_bits.len(), buf);
            Ok(())
        }
        DescriptorKind::Container(container) | DescriptorKind::ProgressiveContainer(container) => {
            let values = value.as_container()?;
            check_length(values.len(), container.fields.len())?;
            let start = buf.len();
            let mut slots = Vec::new();
            for (field, field_value) in container.fields.iter().zip(values) {
                if field.is_dynamic() {
                    slots.push(buf.len());
                    buf.extend_from_slice(&[0u8; BYTES_PER_LENGTH_OFFSET]);
                } else {
                    encode_value(ctx, &field.desc, field_value, buf)?;
                }
            }
            let mut slots = slots.into_iter();
            for (field, field_value) in container.fields.iter().zip(values) {
                if field.is_dynamic() {
                    let slot = slots.next().expect("one slot was reserved per dynamic field");
                    let offset = buf.len() - start;
                    patch_offset(buf, slot, offset)?;
                    encode_value(ctx, &field.desc, field_value, buf)?;
                }
            }
            Ok(())
        }
        DescriptorKind::Union { variants } => match value {
            Value::Union { selector, value } => {
                let variant = variants.get(*selector as usize).ok_or(
                    SszError::InvalidUnionVariant {
                        selector: *selector,
                        variants: variants.len(),
                    },
                )?;
                buf.push(*selector);
                encode_value(ctx, &variant.desc, value, buf)
            }
            other => Err(other.mismatch("union")),
        },
        DescriptorKind::Wrapper { inner } => encode_value(ctx, inner, value, buf),
        DescriptorKind::Custom => desc
            .codec_override
            .as_ref()
            .ok_or_else(|| SszError::UnsupportedKind("custom type without codec".to_string()))?
            .encode(value, buf),
    }
}

fn encode_uint(uint: UintKind, value: &Value, buf: &mut Vec<u8>) -> Result<(), SszError> {
    match (uint, value) {
        (UintKind::U8, Value::U8(v)) => buf.push(*v),
        (UintKind::U16, Value::U16(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintKind::U32, Value::U32(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintKind::U64, Value::U64(v)) => buf.extend_from_slice(&v.to_le_bytes()),
        (UintKind::U128, Value::U128(v)) => buf.extend_from_slice(&v.to_le_bytes::<16>()),
        (UintKind::U256, Value::U256(v)) => buf.extend_from_slice(&v.to_le_bytes::<32>()),
        // Wide uints may also arrive as raw little-endian payloads.
        (UintKind::U128, Value::Bytes(bytes)) if bytes.len() == 16 => {
            buf.extend_from_slice(bytes);
        }
        (UintKind::U256, Value::Bytes(bytes)) if bytes.len() == 32 => {
            buf.extend_from_slice(bytes);
        }
        (_, other) => return Err(other.mismatch("uint")),
    }
    Ok(())
}

fn encode_byte_vector(
    desc: &TypeDescriptor,
    value: &Value,
    length: usize,
    buf: &mut Vec<u8>,
) -> Result<(), SszError> {
    let payload = value.as_byte_payload()?;
    if desc.is_string {
        // Strings pad to their fixed size with trailing zeroes.
        if payload.len() > length {
            return Err(SszError::LengthMismatch {
                len: payload.len(),
                expected: length,
            });
        }
        buf.extend_from_slice(payload);
        buf.extend(std::iter::repeat_n(0u8, length - payload.len()));
    } else {
        check_length(payload.len(), length)?;
        buf.extend_from_slice(payload);
    }
    Ok(())
}

fn encode_sequence(
    ctx: &EngineCtx,
    elem: &TypeDescriptor,
    items: &[Value],
    buf: &mut Vec<u8>,
) -> Result<(), SszError> {
    if elem.static_size.is_some() {
        for item in items {
            encode_value(ctx, elem, item, buf)?;
        }
        return Ok(());
    }
    // Dynamic elements: per-element offsets relative to the start of the
    // element region.
    let start = buf.len();
    buf.extend(std::iter::repeat_n(
        0u8,
        items.len() * BYTES_PER_LENGTH_OFFSET,
    ));
    for (i, item) in items.iter().enumerate() {
        let offset = buf.len() - start;
        patch_offset(buf, start + i * BYTES_PER_LENGTH_OFFSET, offset)?;
        encode_value(ctx, elem, item, buf)?;
    }
    Ok(())
}

fn encode_bitlist(bytes: &[u8], bit_len: usize, buf: &mut Vec<u8>) {
    let out_len = (bit_len + 1).div_ceil(8);
    let start = buf.len();
    buf.extend(std::iter::repeat_n(0u8, out_len));
    buf[start..start + bytes.len()].copy_from_slice(bytes);
    buf[start + bit_len / 8] |= 1 << (bit_len % 8);
}

fn patch_offset(buf: &mut [u8], slot: usize, offset: usize) -> Result<(), SszError> {
    let wire = u32::try_from(offset).map_err(|_| SszError::OffsetOutOfBounds(offset))?;
    buf[slot..slot + BYTES_PER_LENGTH_OFFSET].copy_from_slice(&wire.to_le_bytes());
    Ok(())
}

/// Encodes `value` into a fresh buffer sized by [`size_of`].
pub(crate) fn encode_to_vec(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
) -> Result<Vec<u8>, SszError> {
    let size = size_of(ctx, desc, value)?;
    let mut buf = Vec::with_capacity(size);
    encode_value(ctx, desc, value, &mut buf)?;
    debug_assert_eq!(buf.len(), size, "size() and marshal() disagree");
    Ok(buf)
}
