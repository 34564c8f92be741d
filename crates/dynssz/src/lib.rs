//! Dynamic SimpleSerialize (SSZ) codec.
//!
//! This crate encodes, decodes, sizes, and merkleizes values whose shape is
//! described at runtime: a host type ([`TypeExpr`]/[`TypeDef`]) plus field
//! annotations compile into an immutable [`TypeDescriptor`] under a
//! [`SpecResolver`] of named preset values. Container sizes, list
//! capacities, and vector lengths can be expressions over those names
//! (`dynssz-size="SLOTS_PER_HISTORICAL_ROOT"`), so one type definition
//! serves any number of network presets.
//!
//! ## Encoding and decoding
//!
//! ```rust
//! use dynssz::{Annotations, DynSsz, TypeDef, TypeExpr, Value};
//!
//! // minimal-preset spec: historical roots shrink from 8192 to 64
//! let codec = DynSsz::new([("SLOTS_PER_HISTORICAL_ROOT".to_string(), 64u64)]);
//!
//! let state = TypeDef::container("HistoricalBatch")
//!     .field(
//!         "block_roots",
//!         TypeExpr::array(TypeExpr::bytes(32), 8192),
//!         Annotations::none().dyn_size("SLOTS_PER_HISTORICAL_ROOT,?"),
//!     )
//!     .build();
//! let ty = TypeExpr::Named(state);
//!
//! let value = Value::Container(vec![Value::Seq(vec![
//!     Value::Bytes(vec![0u8; 32]);
//!     64
//! ])]);
//! let bytes = codec.marshal(&ty, &value).unwrap();
//! assert_eq!(bytes.len(), 64 * 32);
//! assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), value);
//! let _root = codec.hash_tree_root(&ty, &value).unwrap();
//! ```
//!
//! Merkle proofs over encoded values live in [`dynssz_merkle`], re-exported
//! here as [`merkle`].

pub mod annotation;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod expr;
pub mod runtime;
pub mod schema;
pub mod spec;
pub mod stream;
pub mod value;

mod decode;
mod encode;
mod hashing;
mod size;

pub use annotation::Annotations;
pub use codec::DynSsz;
pub use descriptor::{
    BYTES_PER_LENGTH_OFFSET, ContainerDescriptor, DescriptorKind, FieldDescriptor,
    MAX_UNION_SELECTOR, TypeDescriptor, UintKind, VariantDescriptor,
};
pub use error::{AnnotationError, ExprError, SszError};
pub use expr::SizeExpr;
pub use schema::{CodecOverride, FieldDef, TypeBody, TypeDef, TypeExpr};
pub use spec::{SpecResolver, SpecValue};
pub use stream::LimitedReader;
pub use value::{BitSeq, Value};

/// Merkleization and proof primitives.
pub use dynssz_merkle as merkle;
/// Wide integers and byte arrays.
pub use dynssz_primitives::{Hash256, U128, U256};
