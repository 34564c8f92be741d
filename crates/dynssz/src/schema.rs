//! Runtime host-type model.
//!
//! Rust has no runtime reflection, so the shape of a host type is described
//! explicitly: [`TypeExpr`] for structural types and [`TypeDef`] for named
//! containers, wrappers, unions, and custom codecs. Field annotations use
//! the grammar in [`annotation`](crate::annotation).

use std::fmt;
use std::sync::Arc;

use dynssz_primitives::Hash256;

use crate::annotation::Annotations;
use crate::error::SszError;
use crate::value::Value;

/// A structural host type.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// `bool`.
    Bool,
    /// `u8`.
    U8,
    /// `u16`.
    U16,
    /// `u32`.
    U32,
    /// `u64`.
    U64,
    /// 128-bit unsigned integer.
    U128,
    /// 256-bit unsigned integer.
    U256,
    /// A UTF-8 string, encoded as its bytes.
    Str,
    /// A fixed-length array `[T; N]`.
    Array {
        /// Element type.
        elem: Box<TypeExpr>,
        /// Host-declared length.
        len: usize,
    },
    /// A growable sequence `Vec<T>`.
    Seq {
        /// Element type.
        elem: Box<TypeExpr>,
    },
    /// A reference to a named definition.
    Named(Arc<TypeDef>),
}

impl TypeExpr {
    /// Shorthand for an array type.
    pub fn array(elem: TypeExpr, len: usize) -> Self {
        TypeExpr::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Shorthand for a sequence type.
    pub fn seq(elem: TypeExpr) -> Self {
        TypeExpr::Seq {
            elem: Box::new(elem),
        }
    }

    /// Shorthand for `[u8; len]`.
    pub fn bytes(len: usize) -> Self {
        Self::array(TypeExpr::U8, len)
    }

    /// Shorthand for `Vec<u8>`.
    pub fn byte_seq() -> Self {
        Self::seq(TypeExpr::U8)
    }

    /// The name of the referenced definition, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(def) => Some(def.name()),
            _ => None,
        }
    }
}

impl From<Arc<TypeDef>> for TypeExpr {
    fn from(def: Arc<TypeDef>) -> Self {
        TypeExpr::Named(def)
    }
}

/// A named type definition.
#[derive(Debug)]
pub struct TypeDef {
    name: String,
    body: TypeBody,
    codec_override: Option<Arc<dyn CodecOverride>>,
}

/// The body of a named definition.
#[derive(Debug)]
pub enum TypeBody {
    /// An ordered-field container.
    Container {
        /// Fields in declaration order.
        fields: Vec<FieldDef>,
        /// Whether the container merkleizes progressively with explicit
        /// field indices.
        progressive: bool,
    },
    /// A transparent wrapper around one inner type.
    Wrapper {
        /// The wrapped type with its annotations.
        inner: FieldDef,
    },
    /// A compatible union: 1-byte selector plus the selected variant.
    Union {
        /// Variants in selector order.
        variants: Vec<FieldDef>,
    },
    /// An opaque payload delegated to an external codec.
    Custom {
        /// Static size, when the payload is fixed-length.
        static_size: Option<usize>,
    },
}

/// One field of a container (or variant of a union).
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field host type.
    pub ty: TypeExpr,
    /// Field annotations.
    pub annotations: Annotations,
}

impl TypeDef {
    /// Starts a container definition.
    pub fn container(name: &str) -> TypeDefBuilder {
        TypeDefBuilder::new(name, false)
    }

    /// Starts a progressive-container definition; fields carry `ssz-index`.
    pub fn progressive_container(name: &str) -> TypeDefBuilder {
        TypeDefBuilder::new(name, true)
    }

    /// Defines a transparent wrapper.
    pub fn wrapper(name: &str, inner: TypeExpr, annotations: Annotations) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            body: TypeBody::Wrapper {
                inner: FieldDef {
                    name: "inner".to_string(),
                    ty: inner,
                    annotations,
                },
            },
            codec_override: None,
        })
    }

    /// Defines a compatible union from `(variant name, type, annotations)`.
    pub fn union(
        name: &str,
        variants: impl IntoIterator<Item = (String, TypeExpr, Annotations)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            body: TypeBody::Union {
                variants: variants
                    .into_iter()
                    .map(|(name, ty, annotations)| FieldDef {
                        name,
                        ty,
                        annotations,
                    })
                    .collect(),
            },
            codec_override: None,
        })
    }

    /// Defines an opaque type handled entirely by `codec`.
    pub fn custom(
        name: &str,
        static_size: Option<usize>,
        codec: Arc<dyn CodecOverride>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            body: TypeBody::Custom { static_size },
            codec_override: Some(codec),
        })
    }

    /// The definition's name; also its descriptor-cache identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The definition body.
    pub fn body(&self) -> &TypeBody {
        &self.body
    }

    /// The host-provided optimized codec, if any.
    pub fn codec_override(&self) -> Option<&Arc<dyn CodecOverride>> {
        self.codec_override.as_ref()
    }
}

/// Builder for container definitions.
#[derive(Debug)]
pub struct TypeDefBuilder {
    name: String,
    progressive: bool,
    fields: Vec<FieldDef>,
    codec_override: Option<Arc<dyn CodecOverride>>,
}

impl TypeDefBuilder {
    fn new(name: &str, progressive: bool) -> Self {
        Self {
            name: name.to_string(),
            progressive,
            fields: Vec::new(),
            codec_override: None,
        }
    }

    /// Appends a field.
    pub fn field(mut self, name: &str, ty: TypeExpr, annotations: Annotations) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            ty,
            annotations,
        });
        self
    }

    /// Attaches a host-provided optimized codec.
    ///
    /// Honored by both the reflective engine and the generator when the
    /// descriptor carries no size expressions and fast paths are enabled.
    pub fn codec_override(mut self, codec: Arc<dyn CodecOverride>) -> Self {
        self.codec_override = Some(codec);
        self
    }

    /// Finishes the definition.
    pub fn build(self) -> Arc<TypeDef> {
        Arc::new(TypeDef {
            name: self.name,
            body: TypeBody::Container {
                fields: self.fields,
                progressive: self.progressive,
            },
            codec_override: self.codec_override,
        })
    }
}

/// A host-provided codec that bypasses the reflective engine.
///
/// Implementations must produce byte images and roots identical to what the
/// reflective engine would produce for the same logical type; the engine
/// delegates without re-validating.
pub trait CodecOverride: Send + Sync {
    /// Exact encoded size of `value`.
    fn ssz_size(&self, value: &Value) -> Result<usize, SszError>;

    /// Appends the encoding of `value` to `buf`.
    fn encode(&self, value: &Value, buf: &mut Vec<u8>) -> Result<(), SszError>;

    /// Decodes a value from exactly `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<Value, SszError>;

    /// Hash tree root of `value`.
    fn hash_tree_root(&self, value: &Value) -> Result<Hash256, SszError>;
}

impl fmt::Debug for dyn CodecOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodecOverride")
    }
}
