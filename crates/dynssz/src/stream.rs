//! Streaming adapters: a limited reader with an explicit limit stack and a
//! size-driven streaming writer.
//!
//! The limit stack replaces nested `Take` wrappers: each frame records the
//! absolute position where its enclosing value ends, reads are capped by the
//! innermost frame, and popping a frame reports how many bytes it consumed.

use std::io::{Read, Write};

use crate::codec::EngineCtx;
use crate::decode::decode_value;
use crate::descriptor::{
    BYTES_PER_LENGTH_OFFSET, ContainerDescriptor, DescriptorKind, TypeDescriptor,
};
use crate::encode::encode_value;
use crate::error::SszError;
use crate::size::size_of;
use crate::value::Value;

/// A sequential reader bounded by a stack of byte limits.
#[derive(Debug)]
pub struct LimitedReader<'a, R: ?Sized> {
    inner: &'a mut R,
    consumed: u64,
    frames: Vec<Frame>,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    start: u64,
    end: u64,
}

impl<'a, R: Read + ?Sized> LimitedReader<'a, R> {
    /// Wraps `inner` with no limit.
    pub fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            consumed: 0,
            frames: Vec::new(),
        }
    }

    /// Total bytes consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Enters a value of `len` bytes. The new frame is clamped to its
    /// parent, so a corrupt inner length cannot escape the outer one.
    pub fn push_limit(&mut self, len: u64) {
        let end = self.consumed.saturating_add(len);
        let end = match self.frames.last() {
            Some(parent) => end.min(parent.end),
            None => end,
        };
        self.frames.push(Frame {
            start: self.consumed,
            end,
        });
    }

    /// Leaves the current value, returning the bytes it consumed.
    pub fn pop_limit(&mut self) -> u64 {
        match self.frames.pop() {
            Some(frame) => self.consumed - frame.start,
            None => self.consumed,
        }
    }

    /// Bytes still readable within the innermost frame, if bounded.
    pub fn remaining(&self) -> Option<u64> {
        self.frames.last().map(|frame| frame.end - self.consumed)
    }

    /// Reads exactly `len` bytes.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, SszError> {
        if let Some(remaining) = self.remaining() {
            if (len as u64) > remaining {
                return Err(SszError::UnexpectedEof {
                    needed: len,
                    available: remaining as usize,
                });
            }
        }
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                SszError::UnexpectedEof {
                    needed: len,
                    available: 0,
                }
            } else {
                SszError::Source(err)
            }
        })?;
        self.consumed += len as u64;
        Ok(buf)
    }

    /// Reads and discards `len` bytes.
    fn skip(&mut self, len: usize) -> Result<(), SszError> {
        self.read_vec(len).map(|_| ())
    }

    /// Drains the source to its end.
    fn read_to_end_vec(&mut self) -> Result<Vec<u8>, SszError> {
        let mut buf = Vec::new();
        self.inner
            .read_to_end(&mut buf)
            .map_err(SszError::Source)?;
        self.consumed += buf.len() as u64;
        Ok(buf)
    }
}

/// Decodes a value from `reader`.
///
/// `len` is the encoded byte length when the caller knows it; `None` reads
/// the source to its end first (only sensible for the outermost value).
pub(crate) fn decode_from<R: Read + ?Sized>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    reader: &mut R,
    len: Option<usize>,
) -> Result<Value, SszError> {
    let mut reader = LimitedReader::new(reader);
    match len {
        None => {
            let buf = reader.read_to_end_vec()?;
            decode_value(ctx, desc, &buf)
        }
        Some(len) => {
            reader.push_limit(len as u64);
            let value = decode_stream(ctx, desc, &mut reader, len)?;
            reader.pop_limit();
            Ok(value)
        }
    }
}

/// Streaming decode of one value spanning exactly `len` bytes.
///
/// Containers and offset-bearing sequences are walked incrementally; leaf
/// values buffer only their own span.
fn decode_stream<R: Read + ?Sized>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    reader: &mut LimitedReader<'_, R>,
    len: usize,
) -> Result<Value, SszError> {
    if let Some(size) = desc.static_size {
        if len != size {
            return Err(SszError::InvalidByteLength {
                len,
                expected: size,
            });
        }
        let buf = reader.read_vec(size)?;
        return decode_value(ctx, desc, &buf);
    }
    // Fast-path overrides only exist for buffers; hand them the whole span.
    if desc.fast_path().is_some() && !ctx.no_fast_path {
        let buf = reader.read_vec(len)?;
        return decode_value(ctx, desc, &buf);
    }
    match &desc.kind {
        DescriptorKind::Container(container) | DescriptorKind::ProgressiveContainer(container) => {
            decode_stream_container(ctx, container, reader, len)
        }
        DescriptorKind::Union { variants } => {
            if len == 0 {
                return Err(SszError::UnexpectedEof {
                    needed: 1,
                    available: 0,
                });
            }
            let selector = reader.read_vec(1)?[0];
            let variant =
                variants
                    .get(selector as usize)
                    .ok_or(SszError::InvalidUnionVariant {
                        selector,
                        variants: variants.len(),
                    })?;
            reader.push_limit((len - 1) as u64);
            let value = decode_stream(ctx, &variant.desc, reader, len - 1)?;
            reader.pop_limit();
            Ok(Value::Union {
                selector,
                value: Box::new(value),
            })
        }
        DescriptorKind::Wrapper { inner } => decode_stream(ctx, inner, reader, len),
        DescriptorKind::List { elem, .. } | DescriptorKind::ProgressiveList { elem }
            if !desc.is_byte_seq && elem.static_size.is_none() =>
        {
            decode_stream_dynamic_list(ctx, desc, elem, reader, len)
        }
        // Everything else is a leaf at the stream level.
        _ => {
            let buf = reader.read_vec(len)?;
            decode_value(ctx, desc, &buf)
        }
    }
}

fn decode_stream_container<R: Read + ?Sized>(
    ctx: &EngineCtx,
    container: &ContainerDescriptor,
    reader: &mut LimitedReader<'_, R>,
    len: usize,
) -> Result<Value, SszError> {
    if len < container.fixed_head {
        return Err(SszError::UnexpectedEof {
            needed: container.fixed_head,
            available: len,
        });
    }
    let head = reader.read_vec(container.fixed_head)?;

    let mut values: Vec<Option<Value>> = Vec::with_capacity(container.fields.len());
    let mut offsets = Vec::new();
    let mut head_pos = 0;
    for field in &container.fields {
        match field.desc.static_size {
            Some(size) => {
                values.push(Some(decode_value(
                    ctx,
                    &field.desc,
                    &head[head_pos..head_pos + size],
                )?));
                head_pos += size;
            }
            None => {
                let offset = u32::from_le_bytes(
                    head[head_pos..head_pos + BYTES_PER_LENGTH_OFFSET]
                        .try_into()
                        .expect("offset slice is 4 bytes"),
                ) as usize;
                offsets.push(offset);
                values.push(None);
                head_pos += BYTES_PER_LENGTH_OFFSET;
            }
        }
    }

    validate_offsets(&offsets, container.fixed_head, len)?;

    // The spans between consecutive offsets drive the recursion; any slack
    // before the first offset is skipped.
    if let Some(&first) = offsets.first() {
        if first > container.fixed_head {
            reader.skip(first - container.fixed_head)?;
        }
    }
    let mut dynamic_index = 0;
    for (slot, field) in container.fields.iter().enumerate() {
        if field.desc.static_size.is_some() {
            continue;
        }
        let start = offsets[dynamic_index];
        let end = offsets
            .get(dynamic_index + 1)
            .copied()
            .unwrap_or(len);
        let span = end - start;
        reader.push_limit(span as u64);
        let value = decode_stream(ctx, &field.desc, reader, span)?;
        let consumed = reader.pop_limit();
        if consumed != span as u64 {
            return Err(SszError::InvalidByteLength {
                len: consumed as usize,
                expected: span,
            });
        }
        values[slot] = Some(value);
        dynamic_index += 1;
    }

    Ok(Value::Container(
        values
            .into_iter()
            .map(|value| value.expect("every field slot was filled"))
            .collect(),
    ))
}

fn decode_stream_dynamic_list<R: Read + ?Sized>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    elem: &TypeDescriptor,
    reader: &mut LimitedReader<'_, R>,
    len: usize,
) -> Result<Value, SszError> {
    if len == 0 {
        return Ok(Value::Seq(Vec::new()));
    }
    if len < BYTES_PER_LENGTH_OFFSET {
        return Err(SszError::UnexpectedEof {
            needed: BYTES_PER_LENGTH_OFFSET,
            available: len,
        });
    }
    let first_bytes = reader.read_vec(BYTES_PER_LENGTH_OFFSET)?;
    let first = u32::from_le_bytes(first_bytes.try_into().expect("read 4 bytes")) as usize;
    if first % BYTES_PER_LENGTH_OFFSET != 0 || first == 0 {
        return Err(SszError::InvalidListPrefix(first));
    }
    let count = first / BYTES_PER_LENGTH_OFFSET;
    if let DescriptorKind::List {
        limit: Some(limit), ..
    } = &desc.kind
    {
        if count > *limit {
            return Err(SszError::ListTooBig { len: count, limit: *limit });
        }
    }

    let mut offsets = Vec::with_capacity(count);
    offsets.push(first);
    let rest = reader.read_vec((count - 1) * BYTES_PER_LENGTH_OFFSET)?;
    for chunk in rest.chunks_exact(BYTES_PER_LENGTH_OFFSET) {
        offsets.push(u32::from_le_bytes(chunk.try_into().expect("chunked by 4")) as usize);
    }
    validate_offsets(&offsets, first, len)?;

    let mut items = Vec::with_capacity(count);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(len);
        let span = end - start;
        reader.push_limit(span as u64);
        items.push(decode_stream(ctx, elem, reader, span)?);
        reader.pop_limit();
    }
    Ok(Value::Seq(items))
}

fn validate_offsets(offsets: &[usize], head: usize, len: usize) -> Result<(), SszError> {
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

/// Streams the encoding of `value` into `writer`, returning the bytes
/// written.
///
/// Offsets are computed from [`size_of`], so nothing but leaf payloads is
/// buffered and the byte image matches the buffered path exactly.
pub(crate) fn encode_to<W: Write + ?Sized>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
    writer: &mut W,
) -> Result<usize, SszError> {
    let total = size_of(ctx, desc, value)?;
    write_value(ctx, desc, value, writer)?;
    Ok(total)
}

fn write_value<W: Write + ?Sized>(
    ctx: &EngineCtx,
    desc: &TypeDescriptor,
    value: &Value,
    writer: &mut W,
) -> Result<(), SszError> {
    match &desc.kind {
        DescriptorKind::Container(container) | DescriptorKind::ProgressiveContainer(container)
            if desc.is_dynamic() && (ctx.no_fast_path || desc.fast_path().is_none()) =>
        {
            let values = value.as_container()?;
            // Head first: fixed fields inline, offsets from precomputed
            // sizes.
            let mut offset = container.fixed_head;
            for (field, field_value) in container.fields.iter().zip(values) {
                if field.is_dynamic() {
                    let offset_bytes = u32::try_from(offset)
                        .map_err(|_| SszError::OffsetOutOfBounds(offset))?
                        .to_le_bytes();
                    writer.write_all(&offset_bytes).map_err(SszError::Sink)?;
                    offset += size_of(ctx, &field.desc, field_value)?;
                } else {
                    write_value(ctx, &field.desc, field_value, writer)?;
                }
            }
            for (field, field_value) in container.fields.iter().zip(values) {
                if field.is_dynamic() {
                    write_value(ctx, &field.desc, field_value, writer)?;
                }
            }
            Ok(())
        }
        DescriptorKind::List { elem, .. } | DescriptorKind::ProgressiveList { elem }
            if !desc.is_byte_seq
                && elem.static_size.is_none()
                && (ctx.no_fast_path || desc.fast_path().is_none()) =>
        {
            let items = value.as_seq()?;
            let mut offset = items.len() * BYTES_PER_LENGTH_OFFSET;
            for item in items {
                let offset_bytes = u32::try_from(offset)
                    .map_err(|_| SszError::OffsetOutOfBounds(offset))?
                    .to_le_bytes();
                writer.write_all(&offset_bytes).map_err(SszError::Sink)?;
                offset += size_of(ctx, elem, item)?;
            }
            for item in items {
                write_value(ctx, elem, item, writer)?;
            }
            Ok(())
        }
        // Leaves and static composites buffer their own bytes.
        _ => {
            let mut buf = Vec::new();
            encode_value(ctx, desc, value, &mut buf)?;
            writer.write_all(&buf).map_err(SszError::Sink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_stack_clamps_to_parent() {
        let data = [0u8; 16];
        let mut source: &[u8] = &data;
        let mut reader = LimitedReader::new(&mut source);
        reader.push_limit(8);
        reader.push_limit(100);
        assert_eq!(reader.remaining(), Some(8));
        reader.read_vec(8).unwrap();
        assert!(matches!(
            reader.read_vec(1),
            Err(SszError::UnexpectedEof { .. })
        ));
        assert_eq!(reader.pop_limit(), 8);
        assert_eq!(reader.pop_limit(), 8);
    }

    #[test]
    fn pop_reports_consumed_bytes() {
        let data = [0u8; 16];
        let mut source: &[u8] = &data;
        let mut reader = LimitedReader::new(&mut source);
        reader.push_limit(10);
        reader.read_vec(3).unwrap();
        assert_eq!(reader.pop_limit(), 3);
        assert_eq!(reader.consumed(), 3);
    }

    #[test]
    fn short_source_is_eof() {
        let data = [0u8; 2];
        let mut source: &[u8] = &data;
        let mut reader = LimitedReader::new(&mut source);
        assert!(matches!(
            reader.read_vec(4),
            Err(SszError::UnexpectedEof { .. })
        ));
    }
}
