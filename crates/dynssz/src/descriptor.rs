//! Compiled type descriptors.
//!
//! A [`TypeDescriptor`] is the immutable, fully resolved shape of a host
//! type under one spec: every `dynssz-size`/`dynssz-max` expression has been
//! evaluated, every dimension inherited, every field position computed.
//! Descriptors are shared behind [`Arc`] and never mutated after they are
//! published to the codec's cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::annotation::{Dim, KindHint, ParsedAnnotations};
use crate::error::{AnnotationError, SszError};
use crate::expr::SizeExpr;
use crate::schema::{CodecOverride, FieldDef, TypeBody, TypeDef, TypeExpr};
use crate::spec::SpecResolver;

/// Number of bytes used to represent an offset.
pub const BYTES_PER_LENGTH_OFFSET: usize = 4;

/// The highest possible union selector value.
pub const MAX_UNION_SELECTOR: u8 = 127;

/// Width of a fixed-size unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UintKind {
    /// 1 byte.
    U8,
    /// 2 bytes.
    U16,
    /// 4 bytes.
    U32,
    /// 8 bytes.
    U64,
    /// 16 bytes.
    U128,
    /// 32 bytes.
    U256,
}

impl UintKind {
    /// Encoded width in bytes.
    pub const fn byte_len(self) -> usize {
        match self {
            UintKind::U8 => 1,
            UintKind::U16 => 2,
            UintKind::U32 => 4,
            UintKind::U64 => 8,
            UintKind::U128 => 16,
            UintKind::U256 => 32,
        }
    }
}

/// The SSZ kind of a descriptor, with its per-kind payload.
#[derive(Debug)]
pub enum DescriptorKind {
    /// One strict boolean byte.
    Bool,
    /// A little-endian unsigned integer.
    Uint(UintKind),
    /// `Vector[elem, length]`.
    Vector {
        /// Element descriptor.
        elem: Arc<TypeDescriptor>,
        /// Resolved element count.
        length: usize,
    },
    /// `List[elem, limit]`.
    List {
        /// Element descriptor.
        elem: Arc<TypeDescriptor>,
        /// Resolved capacity, when declared.
        limit: Option<usize>,
    },
    /// `Bitvector[bits]`.
    Bitvector {
        /// Resolved bit count.
        bits: usize,
    },
    /// `Bitlist[limit]`.
    Bitlist {
        /// Resolved bit capacity, when declared.
        limit: Option<usize>,
    },
    /// An ordered-field container.
    Container(ContainerDescriptor),
    /// A sparse container merkleized progressively.
    ProgressiveContainer(ContainerDescriptor),
    /// A list with progressive merkleization and no capacity.
    ProgressiveList {
        /// Element descriptor.
        elem: Arc<TypeDescriptor>,
    },
    /// A bitlist with progressive merkleization and no capacity.
    ProgressiveBitlist,
    /// A transparent wrapper around one inner type.
    Wrapper {
        /// The wrapped descriptor.
        inner: Arc<TypeDescriptor>,
    },
    /// A 1-byte selector followed by the selected variant.
    Union {
        /// Variants in selector order (0..V-1, no gaps).
        variants: Vec<VariantDescriptor>,
    },
    /// An opaque payload delegated to a [`CodecOverride`].
    Custom,
}

/// Field table of a container.
#[derive(Debug)]
pub struct ContainerDescriptor {
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Bytes of the fixed portion: static field sizes plus one offset slot
    /// per dynamic field.
    pub fixed_head: usize,
    /// Active-fields bitvector bytes; empty for plain containers.
    pub active_fields: Vec<u8>,
}

/// One compiled container field.
#[derive(Debug)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Ordinal position for plain containers, `ssz-index` for progressive
    /// ones.
    pub index: u64,
    /// The field's descriptor.
    pub desc: Arc<TypeDescriptor>,
}

impl FieldDescriptor {
    /// Whether the field lives in the variable portion.
    pub fn is_dynamic(&self) -> bool {
        self.desc.static_size.is_none()
    }
}

/// One compiled union variant.
#[derive(Debug)]
pub struct VariantDescriptor {
    /// Variant name.
    pub name: String,
    /// The variant's descriptor.
    pub desc: Arc<TypeDescriptor>,
}

/// The compiled, immutable shape of a host type under one spec.
#[derive(Debug)]
pub struct TypeDescriptor {
    /// The SSZ kind and its payload.
    pub kind: DescriptorKind,
    /// Exact encoded size; `None` when the encoding is variable-length.
    pub static_size: Option<usize>,
    /// The `dynssz-size` expression at this level, kept verbatim for the
    /// code generator's dynamic-spec mode.
    pub size_expr: Option<SizeExpr>,
    /// The `dynssz-max` expression at this level, kept verbatim.
    pub max_expr: Option<SizeExpr>,
    /// Whether any descriptor in this subtree carries an expression.
    pub has_size_expr: bool,
    /// Whether the element type is `u8`, enabling the byte fast path.
    pub is_byte_seq: bool,
    /// Whether the value is a string (bytes with zero-trimming on decode
    /// for fixed sizes).
    pub is_string: bool,
    /// Host definition name, when the type is named.
    pub type_name: Option<String>,
    /// Host-provided optimized codec.
    pub codec_override: Option<Arc<dyn CodecOverride>>,
}

impl TypeDescriptor {
    /// Whether the encoding is variable-length.
    pub fn is_dynamic(&self) -> bool {
        self.static_size.is_none()
    }

    /// Whether the fast-path codec may be taken: one must exist and the
    /// subtree must be spec-independent.
    pub fn fast_path(&self) -> Option<&Arc<dyn CodecOverride>> {
        if self.has_size_expr {
            return None;
        }
        self.codec_override.as_ref()
    }

    fn plain(kind: DescriptorKind, static_size: Option<usize>) -> Self {
        Self {
            kind,
            static_size,
            size_expr: None,
            max_expr: None,
            has_size_expr: false,
            is_byte_seq: false,
            is_string: false,
            type_name: None,
            codec_override: None,
        }
    }
}

/// Compiles descriptors for one spec.
///
/// Named definitions compiled during a single run are memoized locally; the
/// codec's cross-call cache sits above this.
pub(crate) struct Compiler<'a> {
    spec: &'a SpecResolver,
    memo: HashMap<String, Arc<TypeDescriptor>>,
    stack: Vec<String>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(spec: &'a SpecResolver) -> Self {
        Self {
            spec,
            memo: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub(crate) fn compile(
        &mut self,
        ty: &TypeExpr,
        ann: &ParsedAnnotations,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        match ann.head_kind() {
            Some(hint) => self.compile_hinted(ty, ann, hint),
            None => self.compile_inferred(ty, ann),
        }
    }

    fn compile_hinted(
        &mut self,
        ty: &TypeExpr,
        ann: &ParsedAnnotations,
        hint: KindHint,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        match hint {
            KindHint::Uint128 => self.compile_wide_uint(ty, UintKind::U128),
            KindHint::Uint256 => self.compile_wide_uint(ty, UintKind::U256),
            KindHint::Bitvector => {
                let (bits, size_expr) = self.resolve_bit_length(ty, ann)?;
                let mut desc = TypeDescriptor::plain(
                    DescriptorKind::Bitvector { bits },
                    Some(bits.div_ceil(8)),
                );
                desc.size_expr = size_expr;
                desc.has_size_expr = desc.size_expr.is_some();
                Ok(Arc::new(desc))
            }
            KindHint::Bitlist => {
                let (limit, max_expr) = self.resolve_limit(ann)?;
                let mut desc =
                    TypeDescriptor::plain(DescriptorKind::Bitlist { limit }, None);
                desc.max_expr = max_expr;
                desc.has_size_expr = desc.max_expr.is_some();
                Ok(Arc::new(desc))
            }
            KindHint::ProgressiveBitlist => {
                Ok(Arc::new(TypeDescriptor::plain(
                    DescriptorKind::ProgressiveBitlist,
                    None,
                )))
            }
            KindHint::ProgressiveList => {
                let elem_ty = seq_elem(ty).ok_or_else(|| {
                    AnnotationError::HintMismatch {
                        annotation: "ssz-type",
                        host: host_name(ty),
                    }
                })?;
                let elem = self.compile(elem_ty, &ann.tail())?;
                let mut desc =
                    TypeDescriptor::plain(DescriptorKind::ProgressiveList { elem: elem.clone() }, None);
                desc.has_size_expr = elem.has_size_expr;
                desc.is_byte_seq = is_u8(&elem);
                Ok(Arc::new(desc))
            }
            KindHint::Wrapper => {
                let inner = self.compile(ty, &ann.tail())?;
                let mut desc = TypeDescriptor::plain(
                    DescriptorKind::Wrapper {
                        inner: inner.clone(),
                    },
                    inner.static_size,
                );
                desc.has_size_expr = inner.has_size_expr;
                Ok(Arc::new(desc))
            }
            KindHint::ProgressiveContainer => match ty {
                TypeExpr::Named(def) => self.compile_named(def, true),
                _ => Err(AnnotationError::HintMismatch {
                    annotation: "ssz-type",
                    host: host_name(ty),
                }
                .into()),
            },
        }
    }

    fn compile_wide_uint(
        &mut self,
        ty: &TypeExpr,
        uint: UintKind,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        let fits = match ty {
            TypeExpr::U128 => uint == UintKind::U128,
            TypeExpr::U256 => uint == UintKind::U256,
            TypeExpr::Array { elem, len } => {
                matches!(**elem, TypeExpr::U8) && *len == uint.byte_len()
            }
            TypeExpr::Seq { elem } => matches!(**elem, TypeExpr::U8),
            _ => false,
        };
        if !fits {
            return Err(AnnotationError::HintMismatch {
                annotation: "ssz-type",
                host: host_name(ty),
            }
            .into());
        }
        Ok(Arc::new(TypeDescriptor::plain(
            DescriptorKind::Uint(uint),
            Some(uint.byte_len()),
        )))
    }

    fn compile_inferred(
        &mut self,
        ty: &TypeExpr,
        ann: &ParsedAnnotations,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        match ty {
            TypeExpr::Bool => Ok(Arc::new(TypeDescriptor::plain(DescriptorKind::Bool, Some(1)))),
            TypeExpr::U8 => Ok(self.uint(UintKind::U8)),
            TypeExpr::U16 => Ok(self.uint(UintKind::U16)),
            TypeExpr::U32 => Ok(self.uint(UintKind::U32)),
            TypeExpr::U64 => Ok(self.uint(UintKind::U64)),
            TypeExpr::U128 => Ok(self.uint(UintKind::U128)),
            TypeExpr::U256 => Ok(self.uint(UintKind::U256)),
            TypeExpr::Str => self.compile_sequence(&TypeExpr::U8, ann, None, true),
            TypeExpr::Array { elem, len } => self.compile_sequence(elem, ann, Some(*len), false),
            TypeExpr::Seq { elem } => self.compile_sequence(elem, ann, None, false),
            TypeExpr::Named(def) => self.compile_named(def, false),
        }
    }

    fn uint(&self, kind: UintKind) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::plain(
            DescriptorKind::Uint(kind),
            Some(kind.byte_len()),
        ))
    }

    /// Vectors, lists, strings: anything with one element dimension.
    fn compile_sequence(
        &mut self,
        elem_ty: &TypeExpr,
        ann: &ParsedAnnotations,
        host_len: Option<usize>,
        is_string: bool,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        let elem = self.compile(elem_ty, &ann.tail())?;
        let is_byte_seq = is_u8(&elem);

        // Size resolution order: expression, static annotation, host length.
        let size_expr = ann.head_dyn_size().cloned();
        let expr_len = match &size_expr {
            Some(expr) => expr.eval(self.spec)?,
            None => None,
        };
        let static_len = match ann.head_size() {
            Some(Dim::Value(v)) => Some(v as usize),
            Some(Dim::Inherit) => {
                if host_len.is_none() {
                    return Err(AnnotationError::NothingToInherit(host_name(elem_ty)).into());
                }
                host_len
            }
            None => None,
        };
        let length = expr_len.map(|v| v as usize).or(static_len).or(host_len);

        if let Some(length) = length {
            let static_size = elem.static_size.map(|elem_size| elem_size * length);
            let mut desc = TypeDescriptor::plain(
                DescriptorKind::Vector {
                    elem: elem.clone(),
                    length,
                },
                static_size,
            );
            desc.size_expr = size_expr;
            desc.has_size_expr = desc.size_expr.is_some() || elem.has_size_expr;
            desc.is_byte_seq = is_byte_seq;
            desc.is_string = is_string;
            return Ok(Arc::new(desc));
        }

        let (limit, max_expr) = self.resolve_limit(ann)?;
        let mut desc = TypeDescriptor::plain(
            DescriptorKind::List {
                elem: elem.clone(),
                limit,
            },
            None,
        );
        desc.max_expr = max_expr;
        desc.has_size_expr = desc.max_expr.is_some() || elem.has_size_expr;
        desc.is_byte_seq = is_byte_seq;
        desc.is_string = is_string;
        Ok(Arc::new(desc))
    }

    fn resolve_limit(
        &self,
        ann: &ParsedAnnotations,
    ) -> Result<(Option<usize>, Option<SizeExpr>), SszError> {
        let max_expr = ann.head_dyn_max().cloned();
        let expr_limit = match &max_expr {
            Some(expr) => expr.eval(self.spec)?,
            None => None,
        };
        let static_limit = match ann.head_max() {
            Some(Dim::Value(v)) => Some(v as usize),
            Some(Dim::Inherit) | None => None,
        };
        Ok((expr_limit.map(|v| v as usize).or(static_limit), max_expr))
    }

    /// Bit length of a bitvector: expression, then annotation, then eight
    /// bits per host byte.
    fn resolve_bit_length(
        &self,
        ty: &TypeExpr,
        ann: &ParsedAnnotations,
    ) -> Result<(usize, Option<SizeExpr>), SszError> {
        let size_expr = ann.head_dyn_size().cloned();
        let expr_len = match &size_expr {
            Some(expr) => expr.eval(self.spec)?,
            None => None,
        };
        let static_len = match ann.head_size() {
            Some(Dim::Value(v)) => Some(v as usize),
            _ => None,
        };
        let host_bits = match ty {
            TypeExpr::Array { elem, len } if matches!(**elem, TypeExpr::U8) => Some(len * 8),
            _ => None,
        };
        let bits = expr_len
            .map(|v| v as usize)
            .or(static_len)
            .or(host_bits)
            .ok_or_else(|| AnnotationError::HintMismatch {
                annotation: "ssz-type",
                host: host_name(ty),
            })?;
        Ok((bits, size_expr))
    }

    fn compile_named(
        &mut self,
        def: &Arc<TypeDef>,
        force_progressive: bool,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        // A field-level progressive hint reshapes the type, so it bypasses
        // the by-name memo.
        if !force_progressive {
            if let Some(cached) = self.memo.get(def.name()) {
                return Ok(cached.clone());
            }
        }
        if self.stack.iter().any(|name| name == def.name()) {
            return Err(SszError::RecursiveType(def.name().to_string()));
        }
        self.stack.push(def.name().to_string());
        let result = self.compile_named_inner(def, force_progressive);
        self.stack.pop();
        let desc = result?;
        if !force_progressive {
            self.memo.insert(def.name().to_string(), desc.clone());
        }
        Ok(desc)
    }

    fn compile_named_inner(
        &mut self,
        def: &Arc<TypeDef>,
        force_progressive: bool,
    ) -> Result<Arc<TypeDescriptor>, SszError> {
        let mut desc = match def.body() {
            TypeBody::Container {
                fields,
                progressive,
            } => self.compile_container(fields, *progressive || force_progressive)?,
            TypeBody::Wrapper { inner } => {
                let inner_desc = self.compile(&inner.ty, &inner.annotations.parse()?)?;
                let mut desc = TypeDescriptor::plain(
                    DescriptorKind::Wrapper {
                        inner: inner_desc.clone(),
                    },
                    inner_desc.static_size,
                );
                desc.has_size_expr = inner_desc.has_size_expr;
                desc
            }
            TypeBody::Union { variants } => self.compile_union(variants)?,
            TypeBody::Custom { static_size } => {
                TypeDescriptor::plain(DescriptorKind::Custom, *static_size)
            }
        };
        desc.type_name = Some(def.name().to_string());
        desc.codec_override = def.codec_override().cloned();
        Ok(Arc::new(desc))
    }

    fn compile_container(
        &mut self,
        fields: &[FieldDef],
        progressive: bool,
    ) -> Result<TypeDescriptor, SszError> {
        let mut compiled = Vec::with_capacity(fields.len());
        let mut has_size_expr = false;
        let mut previous_index: Option<u64> = None;
        for (ordinal, field) in fields.iter().enumerate() {
            let ann = field.annotations.parse()?;
            let index = if progressive {
                let index = ann.index.ok_or_else(|| {
                    AnnotationError::InvalidFieldIndex(field.name.clone())
                })?;
                if previous_index.is_some_and(|prev| index <= prev) {
                    return Err(AnnotationError::NonIncreasingFieldIndex {
                        field: field.name.clone(),
                        index,
                    }
                    .into());
                }
                if index > 255 {
                    return Err(AnnotationError::FieldIndexTooLarge(index).into());
                }
                previous_index = Some(index);
                index
            } else {
                ordinal as u64
            };
            let desc = self.compile(&field.ty, &ann)?;
            has_size_expr |= desc.has_size_expr;
            compiled.push(FieldDescriptor {
                name: field.name.clone(),
                index,
                desc,
            });
        }

        let fixed_head = compiled
            .iter()
            .map(|field| field.desc.static_size.unwrap_or(BYTES_PER_LENGTH_OFFSET))
            .sum();
        let all_static = compiled.iter().all(|field| !field.is_dynamic());
        let static_size = all_static.then_some(fixed_head);

        let active_fields = if progressive {
            let max_index = compiled.last().map(|field| field.index).unwrap_or(0);
            let mut bytes = vec![0u8; (max_index as usize + 1).div_ceil(8)];
            for field in &compiled {
                bytes[(field.index / 8) as usize] |= 1 << (field.index % 8);
            }
            bytes
        } else {
            Vec::new()
        };

        let container = ContainerDescriptor {
            fields: compiled,
            fixed_head,
            active_fields,
        };
        let kind = if progressive {
            DescriptorKind::ProgressiveContainer(container)
        } else {
            DescriptorKind::Container(container)
        };
        // Progressive containers keep their declared-field wire shape, so
        // static sizing carries over unchanged.
        let mut desc = TypeDescriptor::plain(kind, static_size);
        desc.has_size_expr = has_size_expr;
        Ok(desc)
    }

    fn compile_union(&mut self, variants: &[FieldDef]) -> Result<TypeDescriptor, SszError> {
        if variants.is_empty() || variants.len() > MAX_UNION_SELECTOR as usize + 1 {
            return Err(SszError::UnsupportedKind(format!(
                "union with {} variants",
                variants.len()
            )));
        }
        let mut compiled = Vec::with_capacity(variants.len());
        let mut has_size_expr = false;
        for variant in variants {
            let desc = self.compile(&variant.ty, &variant.annotations.parse()?)?;
            has_size_expr |= desc.has_size_expr;
            compiled.push(VariantDescriptor {
                name: variant.name.clone(),
                desc,
            });
        }
        let mut desc = TypeDescriptor::plain(
            DescriptorKind::Union { variants: compiled },
            None,
        );
        desc.has_size_expr = has_size_expr;
        Ok(desc)
    }
}

fn is_u8(desc: &TypeDescriptor) -> bool {
    matches!(desc.kind, DescriptorKind::Uint(UintKind::U8))
}

fn seq_elem(ty: &TypeExpr) -> Option<&TypeExpr> {
    match ty {
        TypeExpr::Seq { elem } => Some(elem),
        TypeExpr::Array { elem, .. } => Some(elem),
        _ => None,
    }
}

fn host_name(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Bool => "bool".to_string(),
        TypeExpr::U8 => "u8".to_string(),
        TypeExpr::U16 => "u16".to_string(),
        TypeExpr::U32 => "u32".to_string(),
        TypeExpr::U64 => "u64".to_string(),
        TypeExpr::U128 => "u128".to_string(),
        TypeExpr::U256 => "u256".to_string(),
        TypeExpr::Str => "string".to_string(),
        TypeExpr::Array { elem, len } => format!("[{}; {len}]", host_name(elem)),
        TypeExpr::Seq { elem } => format!("Vec<{}>", host_name(elem)),
        TypeExpr::Named(def) => def.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotations;

    fn spec(pairs: &[(&str, u64)]) -> SpecResolver {
        SpecResolver::new(pairs.iter().map(|(k, v)| (k.to_string(), *v)))
    }

    fn compile(ty: &TypeExpr, ann: Annotations, resolver: &SpecResolver) -> Arc<TypeDescriptor> {
        Compiler::new(resolver)
            .compile(ty, &ann.parse().unwrap())
            .unwrap()
    }

    #[test]
    fn primitives_are_static() {
        let resolver = SpecResolver::empty();
        for (ty, size) in [
            (TypeExpr::Bool, 1),
            (TypeExpr::U8, 1),
            (TypeExpr::U16, 2),
            (TypeExpr::U32, 4),
            (TypeExpr::U64, 8),
            (TypeExpr::U128, 16),
            (TypeExpr::U256, 32),
        ] {
            let desc = compile(&ty, Annotations::none(), &resolver);
            assert_eq!(desc.static_size, Some(size));
            assert!(!desc.has_size_expr);
        }
    }

    #[test]
    fn spec_expression_overrides_host_length() {
        let resolver = spec(&[("VEC_SIZE", 6)]);
        let desc = compile(
            &TypeExpr::bytes(32),
            Annotations::none().dyn_size("VEC_SIZE"),
            &resolver,
        );
        assert_eq!(desc.static_size, Some(6));
        assert!(desc.has_size_expr);
        assert!(desc.is_byte_seq);
        match &desc.kind {
            DescriptorKind::Vector { length, .. } => assert_eq!(*length, 6),
            other => panic!("expected vector, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_expression_falls_back_to_static() {
        let resolver = SpecResolver::empty();
        let desc = compile(
            &TypeExpr::byte_seq(),
            Annotations::none().size("48").dyn_size("MISSING"),
            &resolver,
        );
        assert_eq!(desc.static_size, Some(48));
    }

    #[test]
    fn seq_without_size_is_a_list() {
        let resolver = SpecResolver::empty();
        let desc = compile(
            &TypeExpr::seq(TypeExpr::U64),
            Annotations::none().max("1024"),
            &resolver,
        );
        assert!(desc.is_dynamic());
        match &desc.kind {
            DescriptorKind::List { limit, .. } => assert_eq!(*limit, Some(1024)),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn container_head_accounts_for_offsets() {
        let resolver = SpecResolver::empty();
        let def = TypeDef::container("Pair")
            .field("fixed", TypeExpr::U64, Annotations::none())
            .field("dynamic", TypeExpr::byte_seq(), Annotations::none().max("64"))
            .build();
        let desc = compile(&TypeExpr::Named(def), Annotations::none(), &resolver);
        assert!(desc.is_dynamic());
        match &desc.kind {
            DescriptorKind::Container(container) => {
                assert_eq!(container.fixed_head, 8 + BYTES_PER_LENGTH_OFFSET);
                assert!(!container.fields[0].is_dynamic());
                assert!(container.fields[1].is_dynamic());
            }
            other => panic!("expected container, got {other:?}"),
        }
    }

    #[test]
    fn progressive_container_tracks_active_fields() {
        let resolver = SpecResolver::empty();
        let def = TypeDef::progressive_container("Sparse")
            .field("a", TypeExpr::U64, Annotations::none().index("0"))
            .field("c", TypeExpr::bytes(32), Annotations::none().index("2"))
            .field("g", TypeExpr::U16, Annotations::none().index("6"))
            .build();
        let desc = compile(&TypeExpr::Named(def), Annotations::none(), &resolver);
        match &desc.kind {
            DescriptorKind::ProgressiveContainer(container) => {
                assert_eq!(container.active_fields, vec![0b0100_0101]);
                assert_eq!(container.fixed_head, 8 + 32 + 2);
            }
            other => panic!("expected progressive container, got {other:?}"),
        }
    }

    #[test]
    fn progressive_indices_must_increase() {
        let resolver = SpecResolver::empty();
        let def = TypeDef::progressive_container("Bad")
            .field("a", TypeExpr::U64, Annotations::none().index("3"))
            .field("b", TypeExpr::U64, Annotations::none().index("3"))
            .build();
        let err = Compiler::new(&resolver)
            .compile(
                &TypeExpr::Named(def),
                &Annotations::none().parse().unwrap(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SszError::BadAnnotation(AnnotationError::NonIncreasingFieldIndex { .. })
        ));
    }

    #[test]
    fn shared_definitions_compile_once() {
        let resolver = SpecResolver::empty();
        let inner = TypeDef::container("Inner")
            .field("x", TypeExpr::U8, Annotations::none())
            .build();
        let outer = TypeDef::container("Outer")
            .field("inner", TypeExpr::Named(inner.clone()), Annotations::none())
            .field("again", TypeExpr::Named(inner), Annotations::none())
            .build();
        // Sharing is fine; the memo returns the same descriptor.
        let desc = compile(&TypeExpr::Named(outer), Annotations::none(), &resolver);
        assert_eq!(desc.static_size, Some(2));
    }

    #[test]
    fn bitfield_hints() {
        let resolver = spec(&[("COMMITTEE", 9)]);
        let bv = compile(
            &TypeExpr::byte_seq(),
            Annotations::none().kind("bitvector").dyn_size("COMMITTEE"),
            &resolver,
        );
        assert_eq!(bv.static_size, Some(2));
        match bv.kind {
            DescriptorKind::Bitvector { bits } => assert_eq!(bits, 9),
            _ => panic!("expected bitvector"),
        }

        let bl = compile(
            &TypeExpr::byte_seq(),
            Annotations::none().kind("bitlist").max("2048"),
            &resolver,
        );
        assert!(bl.is_dynamic());
        match bl.kind {
            DescriptorKind::Bitlist { limit } => assert_eq!(limit, Some(2048)),
            _ => panic!("expected bitlist"),
        }
    }

    #[test]
    fn union_variants_compile_in_order() {
        let resolver = SpecResolver::empty();
        let def = TypeDef::union(
            "Payload",
            [
                ("word".to_string(), TypeExpr::U32, Annotations::none()),
                (
                    "grid".to_string(),
                    TypeExpr::array(TypeExpr::bytes(5), 2),
                    Annotations::none(),
                ),
            ],
        );
        let desc = compile(&TypeExpr::Named(def), Annotations::none(), &resolver);
        assert!(desc.is_dynamic());
        match &desc.kind {
            DescriptorKind::Union { variants } => {
                assert_eq!(variants.len(), 2);
                assert_eq!(variants[0].desc.static_size, Some(4));
                assert_eq!(variants[1].desc.static_size, Some(10));
            }
            other => panic!("expected union, got {other:?}"),
        }
    }
}
