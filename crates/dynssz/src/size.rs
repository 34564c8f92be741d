//! Exact encoded-size computation.

use crate::codec::EngineCtx;
use crate::descriptor::{BYTES_PER_LENGTH_OFFSET, DescriptorKind, TypeDescriptor};
use crate::error::SszError;
use crate::value::Value;

/// Returns the exact number of bytes `value` encodes to under `desc`.
///
/// Statically sized descriptors return their constant without touching the
/// value; dynamic ones recurse.
pub(crate) fn size_of(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
) -> Result<usize, SszError> {
    if let Some(codec) = desc.fast_path() {
        if !ctx.no_fast_path {
            return codec.ssz_size(value);
        }
    }
    if let Some(size) = desc.static_size {
        return Ok(size);
    }
    match &desc.kind {
        DescriptorKind::Vector { elem, length } => {
            // A vector is only dynamic when its elements are.
            let items = value.as_seq()?;
            check_length(items.len(), *length)?;
            let mut total = length * BYTES_PER_LENGTH_OFFSET;
            for item in items {
                total += size_of(ctx, elem, item)?;
            }
            Ok(total)
        }
        DescriptorKind::List { elem, limit } => {
            if desc.is_byte_seq {
                let payload = value.as_byte_payload()?;
                check_limit(payload.len(), *limit)?;
                return Ok(payload.len());
            }
            let items = value.as_seq()?;
            check_limit(items.len(), *limit)?;
            sequence_size(ctx, elem, items)
        }
        DescriptorKind::ProgressiveList { elem } => {
            if desc.is_byte_seq {
                return Ok(value.as_byte_payload()?.len());
            }
            sequence_size(ctx, elem, value.as_seq()?)
        }
        DescriptorKind::Bitlist { limit } => {
            let bits = value.as_bits()?;
            check_limit(bits.len(), *limit)?;
            Ok((bits.len() + 1).div_ceil(8))
        }
        DescriptorKind::ProgressiveBitlist => {
            let bits = value.as_bits()?;
            Ok((bits.len() + 1).div_ceil(8))
        }
        DescriptorKind::Container(container) | DescriptorKind::ProgressiveContainer(container) => {
            let values = value.as_container()?;
            check_length(values.len(), container.fields.len())?;
            let mut total = container.fixed_head;
            for (field, field_value) in container.fields.iter().zip(values) {
                if field.is_dynamic() {
                    total += size_of(ctx, &field.desc, field_value)?;
                }
            }
            Ok(total)
        }
        DescriptorKind::Union { variants } => match value {
            Value::Union { selector, value } => {
                let variant = variants.get(*selector as usize).ok_or(
                    SszError::InvalidUnionVariant {
                        selector: *selector,
                        variants: variants.len(),
                    },
                )?;
                Ok(1 + size_of(ctx, &variant.desc, value)?)
            }
            other => Err(other.mismatch("union")),
        },
        DescriptorKind::Wrapper { inner } => size_of(ctx, inner, value),
        DescriptorKind::Custom => delegate_size(desc, value),
        // Statically sized kinds were handled by the fast path above.
        DescriptorKind::Bool
        | DescriptorKind::Uint(_)
        | DescriptorKind::Bitvector { .. } => Err(SszError::UnsupportedKind(
            "dynamic size requested for a static kind".to_string(),
        )),
    }
}

fn sequence_size(
    ctx: &EngineCtx,
    elem: &TypeDescriptor,
    items: &[Value],
) -> Result<usize, SszError> {
    if let Some(elem_size) = elem.static_size {
        return Ok(items.len() * elem_size);
    }
    let mut total = items.len() * BYTES_PER_LENGTH_OFFSET;
    for item in items {
        total += size_of(ctx, elem, item)?;
    }
    Ok(total)
}

/// Custom payloads always go through their codec, even with fast paths
/// disabled; the reflective engine has no other source of truth for them.
fn delegate_size(desc: &TypeDescriptor, value: &Value) -> Result<usize, SszError> {
    desc.codec_override
        .as_ref()
        .ok_or_else(|| SszError::UnsupportedKind("custom type without codec".to_string()))?
        .ssz_size(value)
}

pub(crate) fn check_limit(len: usize, limit: Option<usize>) -> Result<(), SszError> {
    match limit {
        Some(limit) if len > limit => Err(SszError::ListTooBig { len, limit }),
        _ => Ok(()),
    }
}

pub(crate) fn check_length(len: usize, expected: usize) -> Result<(), SszError> {
    if len != expected {
        Err(SszError::LengthMismatch { len, expected })
    } else {
        Ok(())
    }
}
