//! Descriptor-driven hash-tree-root computation.

use dynssz_merkle::{
    Hash256, HashEngine, merkle_root, merkleize_chunks, merkleize_progressive,
    mix_in_active_fields, mix_in_length, mix_in_selector, pack_bytes,
};

use crate::codec::EngineCtx;
use crate::descriptor::{DescriptorKind, TypeDescriptor};
use crate::encode::encode_value;
use crate::error::SszError;
use crate::size::{check_length, check_limit};
use crate::value::Value;

/// Bytes per merkle chunk.
const BYTES_PER_CHUNK: usize = 32;

/// Computes the hash tree root of `value` under `desc`.
pub(crate) fn hash_value<H: HashEngine>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
) -> Result<Hash256, SszError> {
    if let Some(codec) = desc.fast_path() {
        if !ctx.no_fast_path {
            return codec.hash_tree_root(value);
        }
    }
    match &desc.kind {
        DescriptorKind::Bool | DescriptorKind::Uint(_) => {
            let mut packed = Vec::with_capacity(BYTES_PER_CHUNK);
            encode_value(ctx, desc, value, &mut packed)?;
            Ok(Hash256::right_padding_from(&packed))
        }
        DescriptorKind::Vector { elem, length } => {
            if is_basic(elem) {
                let mut packed = Vec::new();
                encode_value(ctx, desc, value, &mut packed)?;
                let chunks = chunk_count_for_basic(*length, elem);
                return Ok(merkle_root::<H>(&packed, chunks)?);
            }
            let items = value.as_seq()?;
            check_length(items.len(), *length)?;
            let roots = item_roots::<H>(ctx, elem, items)?;
            Ok(merkleize_chunks::<H>(
                &roots,
                length.next_power_of_two().max(1),
            )?)
        }
        DescriptorKind::List { elem, limit } => {
            if is_basic(elem) {
                let count = basic_list_len(desc, value)?;
                check_limit(count, *limit)?;
                let mut packed = Vec::new();
                encode_value(ctx, desc, value, &mut packed)?;
                let chunk_limit = limit
                    .map(|limit| chunk_count_for_basic(limit, elem).next_power_of_two())
                    .unwrap_or(0);
                let root = merkleize_chunks::<H>(&pack_bytes(&packed), chunk_limit)?;
                return Ok(mix_in_length::<H>(&root, count));
            }
            let items = value.as_seq()?;
            check_limit(items.len(), *limit)?;
            let roots = item_roots::<H>(ctx, elem, items)?;
            let chunk_limit = limit
                .map(|limit| limit.next_power_of_two().max(1))
                .unwrap_or(0);
            let root = merkleize_chunks::<H>(&roots, chunk_limit)?;
            Ok(mix_in_length::<H>(&root, items.len()))
        }
        DescriptorKind::ProgressiveList { elem } => {
            if is_basic(elem) {
                let count = basic_list_len(desc, value)?;
                let mut packed = Vec::new();
                encode_value(ctx, desc, value, &mut packed)?;
                let root = merkleize_progressive::<H>(&pack_bytes(&packed))?;
                return Ok(mix_in_length::<H>(&root, count));
            }
            let items = value.as_seq()?;
            let roots = item_roots::<H>(ctx, elem, items)?;
            let root = merkleize_progressive::<H>(&roots)?;
            Ok(mix_in_length::<H>(&root, items.len()))
        }
        DescriptorKind::Bitvector { bits } => {
            let value_bits = value.as_bits()?;
            check_length(value_bits.len(), *bits)?;
            let chunks = bits.div_ceil(8).div_ceil(BYTES_PER_CHUNK);
            Ok(merkle_root::<H>(value_bits.as_bytes(), chunks)?)
        }
        DescriptorKind::Bitlist { limit } => {
            let value_bits = value.as_bits()?;
            check_limit(value_bits.len(), *limit)?;
            let chunk_limit = limit
                .map(|limit| limit.div_ceil(8).div_ceil(BYTES_PER_CHUNK).next_power_of_two())
                .unwrap_or(0);
            let root = merkleize_chunks::<H>(&pack_bytes(value_bits.as_bytes()), chunk_limit)?;
            Ok(mix_in_length::<H>(&root, value_bits.len()))
        }
        DescriptorKind::ProgressiveBitlist => {
            let value_bits = value.as_bits()?;
            let root = merkleize_progressive::<H>(&pack_bytes(value_bits.as_bytes()))?;
            Ok(mix_in_length::<H>(&root, value_bits.len()))
        }
        DescriptorKind::Container(container) => {
            let values = value.as_container()?;
            check_length(values.len(), container.fields.len())?;
            let mut roots = Vec::with_capacity(container.fields.len());
            for (field, field_value) in container.fields.iter().zip(values) {
                roots.push(hash_value::<H>(ctx, &field.desc, field_value)?);
            }
            Ok(merkleize_chunks::<H>(
                &roots,
                container.fields.len().next_power_of_two().max(1),
            )?)
        }
        DescriptorKind::ProgressiveContainer(container) => {
            let values = value.as_container()?;
            check_length(values.len(), container.fields.len())?;
            // Field roots sit at their declared indices; gaps stay zero.
            let max_index = container
                .fields
                .last()
                .map(|field| field.index as usize)
                .unwrap_or(0);
            let mut leaves = vec![Hash256::ZERO; max_index + 1];
            for (field, field_value) in container.fields.iter().zip(values) {
                leaves[field.index as usize] = hash_value::<H>(ctx, &field.desc, field_value)?;
            }
            let root = merkleize_progressive::<H>(&leaves)?;
            Ok(mix_in_active_fields::<H>(&root, &container.active_fields))
        }
        DescriptorKind::Union { variants } => match value {
            Value::Union { selector, value } => {
                let variant = variants.get(*selector as usize).ok_or(
                    SszError::InvalidUnionVariant {
                        selector: *selector,
                        variants: variants.len(),
                    },
                )?;
                let root = hash_value::<H>(ctx, &variant.desc, value)?;
                Ok(mix_in_selector::<H>(&root, *selector))
            }
            other => Err(other.mismatch("union")),
        },
        DescriptorKind::Wrapper { inner } => hash_value::<H>(ctx, inner, value),
        DescriptorKind::Custom => desc
            .codec_override
            .as_ref()
            .ok_or_else(|| SszError::UnsupportedKind("custom type without codec".to_string()))?
            .hash_tree_root(value),
    }
}

fn item_roots<H: HashEngine>(
    ctx: &EngineCtx,
    elem: &TypeDescriptor,
    items: &[Value],
) -> Result<Vec<Hash256>, SszError> {
    items
        .iter()
        .map(|item| hash_value::<H>(ctx, elem, item))
        .collect()
}

fn is_basic(desc: &TypeDescriptor) -> bool {
    matches!(
        desc.kind,
        DescriptorKind::Bool | DescriptorKind::Uint(_)
    )
}

/// Chunk count occupied by `count` packed elements.
fn chunk_count_for_basic(count: usize, elem: &TypeDescriptor) -> usize {
    let elem_size = match &elem.kind {
        DescriptorKind::Bool => 1,
        DescriptorKind::Uint(uint) => uint.byte_len(),
        _ => 1,
    };
    (count * elem_size).div_ceil(BYTES_PER_CHUNK)
}

fn basic_list_len(desc: &TypeDescriptor, value: &Value) -> Result<usize, SszError> {
    if desc.is_byte_seq {
        Ok(value.as_byte_payload()?.len())
    } else {
        Ok(value.as_seq()?.len())
    }
}
