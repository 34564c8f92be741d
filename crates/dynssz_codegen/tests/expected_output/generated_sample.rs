#[allow(unused_imports)]
use dynssz::merkle::{
    Sha256Engine, merkle_root, merkleize_chunks, merkleize_progressive,
    mix_in_active_fields, mix_in_length, mix_in_selector,
};
#[allow(unused_imports)]
use dynssz::{BitSeq, Hash256, SszError, U128, U256};
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub epoch: u64,
    pub root: Vec<u8>,
}
impl Checkpoint {
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), SszError> {
        buf.extend_from_slice(&(&self.epoch).to_le_bytes());
        dynssz::runtime::check_length((&self.root).len(), 32usize)?;
        buf.extend_from_slice((&self.root));
        Ok(())
    }
    pub fn decode(buf: &[u8]) -> Result<Self, SszError> {
        let head: usize = 0usize + 8usize + 32usize;
        dynssz::runtime::check_bytes(buf, head)?;
        let mut pos = 0usize;
        let mut offsets: Vec<usize> = Vec::with_capacity(0usize);
        let epoch = {
            let field_size = 8usize;
            let bytes = dynssz::runtime::take(buf, pos, field_size)?;
            pos += field_size;
            {
                dynssz::runtime::check_bytes(bytes, 8)?;
                u64::from_le_bytes(<[u8; 8]>::try_from(bytes).expect("length checked"))
            }
        };
        let root = {
            let field_size = 32usize;
            let bytes = dynssz::runtime::take(buf, pos, field_size)?;
            pos += field_size;
            {
                dynssz::runtime::check_bytes(bytes, 32usize)?;
                bytes.to_vec()
            }
        };
        let _ = pos;
        dynssz::runtime::validate_offsets(&offsets, head, buf.len())?;
        Ok(Self { epoch, root })
    }
    pub fn size(&self) -> usize {
        40usize
    }
    pub fn hash_tree_root(&self) -> Result<Hash256, SszError> {
        let mut roots = Vec::with_capacity(2usize);
        roots.push(Hash256::right_padding_from(&(&self.epoch).to_le_bytes()));
        roots.push(merkle_root::<Sha256Engine>((&self.root), 32usize.div_ceil(32))?);
        Ok(merkleize_chunks::<Sha256Engine>(&roots, 2usize)?)
    }
}
#[derive(Debug, Clone, PartialEq)]
pub struct SignedSample {
    pub slot: u64,
    pub parent: Checkpoint,
    pub data: Vec<u8>,
    pub extra: Vec<u8>,
}
impl SignedSample {
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), SszError> {
        let start = buf.len();
        buf.extend_from_slice(&(&self.slot).to_le_bytes());
        (&self.parent).encode(buf)?;
        let slot_0 = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        let slot_1 = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        {
            let tail = buf.len() - start;
            dynssz::runtime::write_offset(buf, slot_0, tail)?;
            dynssz::runtime::check_limit((&self.data).len(), Some(64usize))?;
            buf.extend_from_slice((&self.data));
        }
        {
            let tail = buf.len() - start;
            dynssz::runtime::write_offset(buf, slot_1, tail)?;
            dynssz::runtime::check_limit((&self.extra).len(), Some(32usize))?;
            buf.extend_from_slice((&self.extra));
        }
        Ok(())
    }
    pub fn decode(buf: &[u8]) -> Result<Self, SszError> {
        let head: usize = 0usize + 8usize + 40usize + 4usize + 4usize;
        dynssz::runtime::check_head(buf, head)?;
        let mut pos = 0usize;
        let mut offsets: Vec<usize> = Vec::with_capacity(2usize);
        let slot = {
            let field_size = 8usize;
            let bytes = dynssz::runtime::take(buf, pos, field_size)?;
            pos += field_size;
            {
                dynssz::runtime::check_bytes(bytes, 8)?;
                u64::from_le_bytes(<[u8; 8]>::try_from(bytes).expect("length checked"))
            }
        };
        let parent = {
            let field_size = 40usize;
            let bytes = dynssz::runtime::take(buf, pos, field_size)?;
            pos += field_size;
            Checkpoint::decode(bytes)?
        };
        offsets.push(dynssz::runtime::read_offset(buf, pos)?);
        pos += 4;
        offsets.push(dynssz::runtime::read_offset(buf, pos)?);
        pos += 4;
        let _ = pos;
        dynssz::runtime::validate_offsets(&offsets, head, buf.len())?;
        let data = {
            let start = offsets[0usize];
            let end = offsets.get(0usize + 1).copied().unwrap_or(buf.len());
            let bytes = &buf[start..end];
            {
                dynssz::runtime::check_limit(bytes.len(), Some(64usize))?;
                bytes.to_vec()
            }
        };
        let extra = {
            let start = offsets[1usize];
            let end = offsets.get(1usize + 1).copied().unwrap_or(buf.len());
            let bytes = &buf[start..end];
            {
                dynssz::runtime::check_limit(bytes.len(), Some(32usize))?;
                bytes.to_vec()
            }
        };
        Ok(Self { slot, parent, data, extra })
    }
    pub fn size(&self) -> usize {
        0usize + 8usize + 40usize + 4 + (&self.data).len() + 4 + (&self.extra).len()
    }
    pub fn hash_tree_root(&self) -> Result<Hash256, SszError> {
        let mut roots = Vec::with_capacity(4usize);
        roots.push(Hash256::right_padding_from(&(&self.slot).to_le_bytes()));
        roots.push((&self.parent).hash_tree_root()?);
        roots.push({
            let payload: &[u8] = (&self.data).as_slice();
            let min_chunks = Some(64usize).map(|l: usize| l.div_ceil(32)).unwrap_or(0);
            let root = merkle_root::<Sha256Engine>(payload, min_chunks)?;
            mix_in_length::<Sha256Engine>(&root, payload.len())
        });
        roots.push({
            let payload: &[u8] = (&self.extra).as_slice();
            let min_chunks = Some(32usize).map(|l: usize| l.div_ceil(32)).unwrap_or(0);
            let root = merkle_root::<Sha256Engine>(payload, min_chunks)?;
            mix_in_length::<Sha256Engine>(&root, payload.len())
        });
        Ok(merkleize_chunks::<Sha256Engine>(&roots, 4usize)?)
    }
}
