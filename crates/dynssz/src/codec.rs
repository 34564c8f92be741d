//! The codec: descriptor cache plus the public marshal/unmarshal/size/hash
//! operations.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use dynssz_merkle::{Hash256, HashEngine, Sha256Engine};

use crate::annotation::Annotations;
use crate::decode::decode_value;
use crate::descriptor::{Compiler, TypeDescriptor};
use crate::encode::{encode_to_vec, encode_value};
use crate::error::SszError;
use crate::hashing::hash_value;
use crate::schema::TypeExpr;
use crate::size::size_of;
use crate::spec::SpecResolver;
use crate::stream::{decode_from, encode_to};
use crate::value::Value;

/// Behaviour toggles shared by every engine operation.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EngineCtx {
    /// Never delegate to host-provided optimized codecs.
    pub(crate) no_fast_path: bool,
}

/// A dynamic SSZ codec bound to one spec.
///
/// The codec owns an immutable [`SpecResolver`] and a descriptor cache
/// keyed by (type name, spec fingerprint). All operations run on the
/// caller's thread; the cache is the only shared mutable state.
///
/// ## Example
///
/// ```rust
/// use dynssz::{Annotations, DynSsz, TypeDef, TypeExpr, Value};
///
/// let codec = DynSsz::new([("ROOT_COUNT".to_string(), 2u64)]);
/// let block = TypeDef::container("MiniBlock")
///     .field("slot", TypeExpr::U64, Annotations::none())
///     .field(
///         "roots",
///         TypeExpr::seq(TypeExpr::bytes(32)),
///         Annotations::none().dyn_max("ROOT_COUNT"),
///     )
///     .build();
/// let ty = TypeExpr::Named(block);
///
/// let value = Value::Container(vec![
///     Value::U64(7),
///     Value::Seq(vec![Value::Bytes(vec![0xaa; 32])]),
/// ]);
/// let bytes = codec.marshal(&ty, &value).unwrap();
/// assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), value);
/// ```
#[derive(Debug)]
pub struct DynSsz<H: HashEngine = Sha256Engine> {
    spec: SpecResolver,
    fingerprint: u64,
    cache: RwLock<HashMap<(String, u64), Arc<TypeDescriptor>>>,
    ctx: EngineCtx,
    _engine: PhantomData<H>,
}

impl DynSsz<Sha256Engine> {
    /// Creates a codec over `spec` with the SHA-256 hash engine.
    pub fn new(spec: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self::with_engine(SpecResolver::new(spec))
    }
}

impl<H: HashEngine> DynSsz<H> {
    /// Creates a codec over `spec` with an explicit hash engine.
    pub fn with_engine(spec: SpecResolver) -> Self {
        let fingerprint = spec.fingerprint();
        Self {
            spec,
            fingerprint,
            cache: RwLock::new(HashMap::new()),
            ctx: EngineCtx::default(),
            _engine: PhantomData,
        }
    }

    /// Disables host-provided fast-path codecs.
    pub fn without_fast_path(mut self) -> Self {
        self.ctx.no_fast_path = true;
        self
    }

    /// The spec this codec resolves expressions against.
    pub fn spec(&self) -> &SpecResolver {
        &self.spec
    }

    /// Returns the compiled descriptor for `ty`, compiling and caching on
    /// first use.
    ///
    /// Named types are memoized under (name, spec fingerprint); anonymous
    /// structural types are cheap and compile on the fly.
    pub fn descriptor(&self, ty: &TypeExpr) -> Result<Arc<TypeDescriptor>, SszError> {
        if let Some(name) = ty.name() {
            let key = (name.to_string(), self.fingerprint);
            if let Some(cached) = self
                .cache
                .read()
                .expect("descriptor cache lock poisoned")
                .get(&key)
            {
                return Ok(cached.clone());
            }
            // Compile outside any lock; only publication takes the write
            // lock.
            let desc = Compiler::new(&self.spec).compile(ty, &Annotations::none().parse()?)?;
            let mut cache = self.cache.write().expect("descriptor cache lock poisoned");
            // A racing compilation may have published first; keep the
            // existing descriptor so every caller shares one Arc.
            return Ok(cache.entry(key).or_insert_with(|| desc.clone()).clone());
        }
        Compiler::new(&self.spec).compile(ty, &Annotations::none().parse()?)
    }

    /// Serializes `value` into a fresh buffer.
    pub fn marshal(&self, ty: &TypeExpr, value: &Value) -> Result<Vec<u8>, SszError> {
        let desc = self.descriptor(ty)?;
        encode_to_vec(&self.ctx, &desc, value)
    }

    /// Appends the serialization of `value` to `buf`.
    pub fn marshal_into(
        &self,
        ty: &TypeExpr,
        value: &Value,
        buf: &mut Vec<u8>,
    ) -> Result<(), SszError> {
        let desc = self.descriptor(ty)?;
        encode_value(&self.ctx, &desc, value, buf)
    }

    /// Streams the serialization of `value` into `writer`, returning the
    /// number of bytes written.
    ///
    /// The byte image is identical to [`marshal`](Self::marshal).
    pub fn marshal_to<W: Write + ?Sized>(
        &self,
        ty: &TypeExpr,
        value: &Value,
        writer: &mut W,
    ) -> Result<usize, SszError> {
        let desc = self.descriptor(ty)?;
        encode_to(&self.ctx, &desc, value, writer)
    }

    /// Deserializes a value from exactly `buf`.
    pub fn unmarshal(&self, ty: &TypeExpr, buf: &[u8]) -> Result<Value, SszError> {
        let desc = self.descriptor(ty)?;
        decode_value(&self.ctx, &desc, buf)
    }

    /// Deserializes a value from `reader`.
    ///
    /// `len` is the encoded length when known; `None` reads to the end of
    /// the source.
    pub fn unmarshal_from<R: Read + ?Sized>(
        &self,
        ty: &TypeExpr,
        reader: &mut R,
        len: Option<usize>,
    ) -> Result<Value, SszError> {
        let desc = self.descriptor(ty)?;
        decode_from(&self.ctx, &desc, reader, len)
    }

    /// Returns the exact encoded size of `value`.
    pub fn size(&self, ty: &TypeExpr, value: &Value) -> Result<usize, SszError> {
        let desc = self.descriptor(ty)?;
        size_of(&self.ctx, &desc, value)
    }

    /// Computes the hash tree root of `value`.
    pub fn hash_tree_root(&self, ty: &TypeExpr, value: &Value) -> Result<Hash256, SszError> {
        let desc = self.descriptor(ty)?;
        hash_value::<H>(&self.ctx, &desc, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TypeDef;

    #[test]
    fn descriptors_are_cached_per_name() {
        let codec = DynSsz::new([]);
        let def = TypeDef::container("Point")
            .field("x", TypeExpr::U64, Annotations::none())
            .field("y", TypeExpr::U64, Annotations::none())
            .build();
        let ty = TypeExpr::Named(def);
        let a = codec.descriptor(&ty).unwrap();
        let b = codec.descriptor(&ty).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn anonymous_types_compile_on_the_fly() {
        let codec = DynSsz::new([]);
        let ty = TypeExpr::seq(TypeExpr::U16);
        let desc = codec.descriptor(&ty).unwrap();
        assert!(desc.is_dynamic());
        assert!(codec.cache.read().unwrap().is_empty());
    }
}
