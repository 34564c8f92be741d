//! Token emission for the four generated operations.
//!
//! Primitive fields are inlined at the use site; anonymous composite
//! element types become module-level helper functions deduplicated by a
//! content key derived from the descriptor; named types call each other's
//! generated methods.

use std::collections::BTreeMap;
use std::sync::Arc;

use dynssz::{
    ContainerDescriptor, DescriptorKind, SizeExpr, SszError, TypeDef, TypeDescriptor, UintKind,
};
use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::quote;
use sha2::{Digest, Sha256};

use crate::{GeneratorOptions, SpecMode};

pub(crate) struct Emitter {
    options: GeneratorOptions,
    helpers: BTreeMap<String, TokenStream>,
}

fn ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

fn lit(value: usize) -> Literal {
    // Suffixed so literals stay valid method receivers (`8usize.div_ceil(..)`)
    // and infer as `usize` everywhere.
    Literal::usize_suffixed(value)
}

fn camel(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Stable 8-hex-digit key over a descriptor's structure.
fn content_key(desc: &TypeDescriptor) -> String {
    fn describe(desc: &TypeDescriptor, out: &mut String) {
        use std::fmt::Write;
        match &desc.kind {
            DescriptorKind::Bool => out.push_str("bool"),
            DescriptorKind::Uint(uint) => {
                let _ = write!(out, "u{}", uint.byte_len() * 8);
            }
            DescriptorKind::Vector { elem, length } => {
                let _ = write!(out, "vec[{length}:{}](", expr_text(desc.size_expr.as_ref()));
                describe(elem, out);
                out.push(')');
            }
            DescriptorKind::List { elem, limit } => {
                let _ = write!(out, "list[{limit:?}:{}](", expr_text(desc.max_expr.as_ref()));
                describe(elem, out);
                out.push(')');
            }
            DescriptorKind::Bitvector { bits } => {
                let _ = write!(out, "bitvec[{bits}]");
            }
            DescriptorKind::Bitlist { limit } => {
                let _ = write!(out, "bitlist[{limit:?}]");
            }
            DescriptorKind::ProgressiveList { elem } => {
                out.push_str("proglist(");
                describe(elem, out);
                out.push(')');
            }
            DescriptorKind::ProgressiveBitlist => out.push_str("progbitlist"),
            DescriptorKind::Wrapper { inner } => {
                out.push_str("wrap(");
                describe(inner, out);
                out.push(')');
            }
            DescriptorKind::Container(container)
            | DescriptorKind::ProgressiveContainer(container) => {
                out.push_str("container(");
                for field in &container.fields {
                    let _ = write!(out, "{}@{}:", field.name, field.index);
                    describe(&field.desc, out);
                    out.push(',');
                }
                out.push(')');
            }
            DescriptorKind::Union { variants } => {
                out.push_str("union(");
                for variant in variants {
                    describe(&variant.desc, out);
                    out.push(',');
                }
                out.push(')');
            }
            DescriptorKind::Custom => out.push_str("custom"),
        }
        if desc.is_string {
            out.push_str("#str");
        }
        if let Some(name) = &desc.type_name {
            let _ = write!(out, "#{name}");
        }
    }
    fn expr_text(expr: Option<&SizeExpr>) -> String {
        expr.map(|e| e.to_string()).unwrap_or_default()
    }
    let mut text = String::new();
    describe(desc, &mut text);
    let digest = Sha256::digest(text.as_bytes());
    hex_prefix(&digest)
}

fn hex_prefix(digest: &[u8]) -> String {
    digest[..4].iter().map(|byte| format!("{byte:02x}")).collect()
}

impl Emitter {
    pub(crate) fn new(options: GeneratorOptions) -> Self {
        Self {
            options,
            helpers: BTreeMap::new(),
        }
    }

    pub(crate) fn take_helpers(&mut self) -> Vec<TokenStream> {
        std::mem::take(&mut self.helpers).into_values().collect()
    }

    fn dyn_mode(&self) -> bool {
        self.options.mode == SpecMode::Dynamic
    }

    /// Whether `desc`'s own generated routines take a resolver.
    fn needs_spec(&self, desc: &TypeDescriptor) -> bool {
        self.dyn_mode() && desc.has_size_expr
    }

    // ------------------------------------------------------------------
    // type definitions
    // ------------------------------------------------------------------

    /// The Rust type generated values of `desc` inhabit.
    fn rust_type(&self, desc: &TypeDescriptor) -> Result<TokenStream, SszError> {
        if let Some(name) = &desc.type_name {
            let name = ident(name);
            return Ok(quote!(#name));
        }
        Ok(match &desc.kind {
            DescriptorKind::Bool => quote!(bool),
            DescriptorKind::Uint(UintKind::U8) => quote!(u8),
            DescriptorKind::Uint(UintKind::U16) => quote!(u16),
            DescriptorKind::Uint(UintKind::U32) => quote!(u32),
            DescriptorKind::Uint(UintKind::U64) => quote!(u64),
            DescriptorKind::Uint(UintKind::U128) => quote!(U128),
            DescriptorKind::Uint(UintKind::U256) => quote!(U256),
            DescriptorKind::Bitvector { .. }
            | DescriptorKind::Bitlist { .. }
            | DescriptorKind::ProgressiveBitlist => quote!(BitSeq),
            DescriptorKind::Vector { elem, .. }
            | DescriptorKind::List { elem, .. }
            | DescriptorKind::ProgressiveList { elem } => {
                if desc.is_string {
                    quote!(String)
                } else if desc.is_byte_seq {
                    quote!(Vec<u8>)
                } else {
                    let elem_ty = self.rust_type(elem)?;
                    quote!(Vec<#elem_ty>)
                }
            }
            DescriptorKind::Wrapper { inner } => self.rust_type(inner)?,
            DescriptorKind::Container(_)
            | DescriptorKind::ProgressiveContainer(_)
            | DescriptorKind::Union { .. }
            | DescriptorKind::Custom => {
                return Err(SszError::UnsupportedKind(
                    "anonymous container-like type in generated code".to_string(),
                ));
            }
        })
    }

    /// Emits the definition and impl block for one named type.
    pub(crate) fn emit_type(
        &mut self,
        def: &Arc<TypeDef>,
        desc: &Arc<TypeDescriptor>,
    ) -> Result<TokenStream, SszError> {
        let name = ident(def.name());
        match &desc.kind {
            DescriptorKind::Container(container) => {
                self.emit_container(&name, desc, container, false)
            }
            DescriptorKind::ProgressiveContainer(container) => {
                self.emit_container(&name, desc, container, true)
            }
            DescriptorKind::Union { variants } => self.emit_union(&name, desc, variants),
            DescriptorKind::Wrapper { inner } => self.emit_wrapper(&name, desc, inner),
            _ => Err(SszError::UnsupportedKind(format!(
                "cannot generate a type definition for {:?}",
                def.name()
            ))),
        }
    }

    fn emit_container(
        &mut self,
        name: &Ident,
        desc: &TypeDescriptor,
        container: &ContainerDescriptor,
        progressive: bool,
    ) -> Result<TokenStream, SszError> {
        let dyn_ctx = self.needs_spec(desc);
        let mut field_defs = Vec::new();
        for field in &container.fields {
            let fid = ident(&field.name);
            let fty = self.rust_type(&field.desc)?;
            field_defs.push(quote!(pub #fid: #fty));
        }

        let encode_body = self.container_encode_body(container, dyn_ctx)?;
        let decode_body = self.container_decode_body(container, dyn_ctx)?;
        let size_body = self.container_size_body(desc, container, dyn_ctx)?;
        let hash_body = if progressive {
            self.progressive_container_hash_body(container, dyn_ctx)?
        } else {
            self.container_hash_body(container, dyn_ctx)?
        };

        let methods = self.wrap_methods(dyn_ctx, encode_body, decode_body, size_body, hash_body);
        let size_hint = self.size_hint_method(desc, container, dyn_ctx)?;
        Ok(quote! {
            #[derive(Debug, Clone, PartialEq)]
            pub struct #name {
                #(#field_defs),*
            }
            impl #name {
                #methods
                #size_hint
            }
        })
    }

    fn emit_wrapper(
        &mut self,
        name: &Ident,
        desc: &TypeDescriptor,
        inner: &Arc<TypeDescriptor>,
    ) -> Result<TokenStream, SszError> {
        let dyn_ctx = self.needs_spec(desc);
        let inner_ty = self.rust_type(inner)?;
        let val = quote!((&self.0));
        let encode_body = {
            let stmts = self.encode_stmts(inner, &val, dyn_ctx)?;
            quote! { #stmts Ok(()) }
        };
        let decode_body = {
            let expr = self.decode_expr(inner, &quote!(buf), dyn_ctx)?;
            quote! { Ok(Self(#expr)) }
        };
        let size_body = self.value_size_body(inner, &val, dyn_ctx)?;
        let hash_body = {
            let root = self.root_expr(inner, &val, dyn_ctx)?;
            quote! { Ok(#root) }
        };
        let methods = self.wrap_methods(dyn_ctx, encode_body, decode_body, size_body, hash_body);
        Ok(quote! {
            #[derive(Debug, Clone, PartialEq)]
            pub struct #name(pub #inner_ty);
            impl #name {
                #methods
            }
        })
    }

    fn emit_union(
        &mut self,
        name: &Ident,
        desc: &TypeDescriptor,
        variants: &[dynssz::VariantDescriptor],
    ) -> Result<TokenStream, SszError> {
        let dyn_ctx = self.needs_spec(desc);
        let mut variant_defs = Vec::new();
        let mut encode_arms = Vec::new();
        let mut decode_arms = Vec::new();
        let mut size_arms = Vec::new();
        let mut hash_arms = Vec::new();
        for (selector, variant) in variants.iter().enumerate() {
            let vid = ident(&camel(&variant.name));
            let vty = self.rust_type(&variant.desc)?;
            variant_defs.push(quote!(#vid(#vty)));

            let selector_u8 = selector as u8;
            let val = quote!(inner);
            let enc = self.encode_stmts(&variant.desc, &val, dyn_ctx)?;
            encode_arms.push(quote! {
                Self::#vid(inner) => { buf.push(#selector_u8); #enc }
            });
            let dec = self.decode_expr(&variant.desc, &quote!(body), dyn_ctx)?;
            decode_arms.push(quote! {
                #selector_u8 => Self::#vid(#dec),
            });
            let size = if variant.desc.static_size.is_some() {
                let size = lit(variant.desc.static_size.expect("checked static"));
                quote!(#size)
            } else {
                self.value_size_expr(&variant.desc, &val, dyn_ctx)?
            };
            size_arms.push(quote! {
                Self::#vid(inner) => { let _ = inner; 1 + #size }
            });
            let root = self.root_expr(&variant.desc, &val, dyn_ctx)?;
            hash_arms.push(quote! {
                Self::#vid(inner) => mix_in_selector::<Sha256Engine>(&#root, #selector_u8),
            });
        }
        let variant_count = variants.len();
        let encode_body = quote! {
            match self { #(#encode_arms)* }
            Ok(())
        };
        let decode_body = quote! {
            if buf.is_empty() {
                return Err(SszError::UnexpectedEof { needed: 1, available: 0 });
            }
            let body = &buf[1..];
            Ok(match buf[0] {
                #(#decode_arms)*
                other => {
                    return Err(SszError::InvalidUnionVariant {
                        selector: other,
                        variants: #variant_count,
                    });
                }
            })
        };
        let size_body = if dyn_ctx {
            quote! { Ok(match self { #(#size_arms)* }) }
        } else {
            quote! { match self { #(#size_arms)* } }
        };
        let hash_body = quote! {
            Ok(match self { #(#hash_arms)* })
        };
        let methods = self.wrap_methods(dyn_ctx, encode_body, decode_body, size_body, hash_body);
        Ok(quote! {
            #[derive(Debug, Clone, PartialEq)]
            pub enum #name {
                #(#variant_defs),*
            }
            impl #name {
                #methods
            }
        })
    }

    /// Wraps the four bodies in the static or dynamic method signatures.
    fn wrap_methods(
        &self,
        dyn_ctx: bool,
        encode_body: TokenStream,
        decode_body: TokenStream,
        size_body: TokenStream,
        hash_body: TokenStream,
    ) -> TokenStream {
        if dyn_ctx {
            quote! {
                pub fn encode_dynamic(
                    &self,
                    spec: &dynssz::SpecResolver,
                    buf: &mut Vec<u8>,
                ) -> Result<(), SszError> {
                    #encode_body
                }
                pub fn decode_dynamic(
                    spec: &dynssz::SpecResolver,
                    buf: &[u8],
                ) -> Result<Self, SszError> {
                    #decode_body
                }
                pub fn size_dynamic(&self, spec: &dynssz::SpecResolver) -> Result<usize, SszError> {
                    #size_body
                }
                pub fn hash_tree_root_dynamic(
                    &self,
                    spec: &dynssz::SpecResolver,
                ) -> Result<Hash256, SszError> {
                    #hash_body
                }
            }
        } else {
            quote! {
                pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), SszError> {
                    #encode_body
                }
                pub fn decode(buf: &[u8]) -> Result<Self, SszError> {
                    #decode_body
                }
                pub fn size(&self) -> usize {
                    #size_body
                }
                pub fn hash_tree_root(&self) -> Result<Hash256, SszError> {
                    #hash_body
                }
            }
        }
    }

    /// For spec-dependent types that are still fixed-size: expose the
    /// resolved size so parents can lay out their heads at call time.
    fn size_hint_method(
        &mut self,
        desc: &TypeDescriptor,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if !dyn_ctx || desc.static_size.is_none() {
            return Ok(TokenStream::new());
        }
        let mut terms = Vec::new();
        for field in &container.fields {
            terms.push(self.field_size_tokens(&field.desc, dyn_ctx)?);
        }
        Ok(quote! {
            pub fn ssz_fixed_size_dynamic(spec: &dynssz::SpecResolver) -> Result<usize, SszError> {
                Ok(0usize #(+ #terms)*)
            }
        })
    }

    // ------------------------------------------------------------------
    // size-token building blocks
    // ------------------------------------------------------------------

    /// Resolved length of a vector/bitvector at this call site.
    fn len_tokens(&self, length: usize, expr: Option<&SizeExpr>, dyn_ctx: bool) -> TokenStream {
        match expr {
            Some(expr) if dyn_ctx => {
                let text = expr.to_string();
                let fallback = length as u64;
                quote!((spec.resolve_expr(#text, Some(#fallback))? as usize))
            }
            _ => {
                let length = lit(length);
                quote!(#length)
            }
        }
    }

    /// Resolved limit (`Option<usize>` expression) at this call site.
    fn limit_tokens(
        &self,
        limit: Option<usize>,
        expr: Option<&SizeExpr>,
        dyn_ctx: bool,
    ) -> TokenStream {
        match expr {
            Some(expr) if dyn_ctx => {
                let text = expr.to_string();
                let fallback = match limit {
                    Some(limit) => {
                        let limit = limit as u64;
                        quote!(Some(#limit))
                    }
                    None => quote!(None),
                };
                quote!(Some(spec.resolve_expr(#text, #fallback)? as usize))
            }
            _ => match limit {
                Some(limit) => {
                    let limit = lit(limit);
                    quote!(Some(#limit))
                }
                None => quote!(None),
            },
        }
    }

    /// Byte size of a fixed-size field, as a `usize` expression.
    fn field_size_tokens(
        &mut self,
        desc: &TypeDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let Some(static_size) = desc.static_size else {
            return Ok(quote!(4usize));
        };
        if !(dyn_ctx && desc.has_size_expr) {
            let static_size = lit(static_size);
            return Ok(quote!(#static_size));
        }
        match &desc.kind {
            DescriptorKind::Vector { elem, length } => {
                let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                Ok(quote!((#len * #elem_size)))
            }
            DescriptorKind::Bitvector { bits } => {
                let bits = self.len_tokens(*bits, desc.size_expr.as_ref(), dyn_ctx);
                Ok(quote!(#bits.div_ceil(8)))
            }
            DescriptorKind::Wrapper { inner } => self.field_size_tokens(inner, dyn_ctx),
            DescriptorKind::Container(_) | DescriptorKind::ProgressiveContainer(_) => {
                let name = desc.type_name.as_deref().ok_or_else(|| {
                    SszError::UnsupportedKind(
                        "anonymous spec-sized container in generated code".to_string(),
                    )
                })?;
                let name = ident(name);
                Ok(quote!(#name::ssz_fixed_size_dynamic(spec)?))
            }
            _ => {
                let static_size = lit(static_size);
                Ok(quote!(#static_size))
            }
        }
    }

    // ------------------------------------------------------------------
    // encode
    // ------------------------------------------------------------------

    /// Statements appending the encoding of `val` (a `&T` expression).
    fn encode_stmts(
        &mut self,
        desc: &TypeDescriptor,
        val: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if desc.type_name.is_some() {
            return Ok(if self.dyn_mode() && desc.has_size_expr {
                quote!(#val.encode_dynamic(spec, buf)?;)
            } else {
                quote!(#val.encode(buf)?;)
            });
        }
        Ok(match &desc.kind {
            DescriptorKind::Bool => quote!(buf.push(u8::from(*#val));),
            DescriptorKind::Uint(UintKind::U8) => quote!(buf.push(*#val);),
            DescriptorKind::Uint(UintKind::U16)
            | DescriptorKind::Uint(UintKind::U32)
            | DescriptorKind::Uint(UintKind::U64) => {
                quote!(buf.extend_from_slice(&#val.to_le_bytes());)
            }
            DescriptorKind::Uint(UintKind::U128) => {
                quote!(buf.extend_from_slice(&#val.to_le_bytes::<16>());)
            }
            DescriptorKind::Uint(UintKind::U256) => {
                quote!(buf.extend_from_slice(&#val.to_le_bytes::<32>());)
            }
            DescriptorKind::Vector { elem, length } => {
                let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                if desc.is_string {
                    quote!(dynssz::runtime::append_padded(#val.as_bytes(), #len, buf)?;)
                } else if desc.is_byte_seq {
                    quote! {
                        dynssz::runtime::check_length(#val.len(), #len)?;
                        buf.extend_from_slice(#val);
                    }
                } else {
                    let body = self.encode_element_loop(elem, val, dyn_ctx)?;
                    quote! {
                        dynssz::runtime::check_length(#val.len(), #len)?;
                        #body
                    }
                }
            }
            DescriptorKind::List { elem, limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                if desc.is_string {
                    quote! {
                        dynssz::runtime::check_limit(#val.len(), #limit)?;
                        buf.extend_from_slice(#val.as_bytes());
                    }
                } else if desc.is_byte_seq {
                    quote! {
                        dynssz::runtime::check_limit(#val.len(), #limit)?;
                        buf.extend_from_slice(#val);
                    }
                } else {
                    let body = self.encode_element_loop(elem, val, dyn_ctx)?;
                    quote! {
                        dynssz::runtime::check_limit(#val.len(), #limit)?;
                        #body
                    }
                }
            }
            DescriptorKind::ProgressiveList { elem } => {
                if desc.is_byte_seq {
                    quote!(buf.extend_from_slice(#val);)
                } else {
                    self.encode_element_loop(elem, val, dyn_ctx)?
                }
            }
            DescriptorKind::Bitvector { bits } => {
                let bits = self.len_tokens(*bits, desc.size_expr.as_ref(), dyn_ctx);
                quote! {
                    dynssz::runtime::check_length(#val.len(), #bits)?;
                    buf.extend_from_slice(#val.as_bytes());
                }
            }
            DescriptorKind::Bitlist { limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                quote! {
                    dynssz::runtime::check_limit(#val.len(), #limit)?;
                    dynssz::runtime::append_bitlist(#val, buf);
                }
            }
            DescriptorKind::ProgressiveBitlist => {
                quote!(dynssz::runtime::append_bitlist(#val, buf);)
            }
            DescriptorKind::Wrapper { inner } => self.encode_stmts(inner, val, dyn_ctx)?,
            DescriptorKind::Container(_)
            | DescriptorKind::ProgressiveContainer(_)
            | DescriptorKind::Union { .. }
            | DescriptorKind::Custom => {
                return Err(SszError::UnsupportedKind(
                    "anonymous container-like type in generated code".to_string(),
                ));
            }
        })
    }

    /// Per-element encoding, with offsets when the element is dynamic.
    fn encode_element_loop(
        &mut self,
        elem: &Arc<TypeDescriptor>,
        val: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let item_stmts = self.element_encode_call(elem, dyn_ctx)?;
        if elem.static_size.is_some() {
            return Ok(quote! {
                for item in #val.iter() {
                    #item_stmts
                }
            });
        }
        Ok(quote! {
            {
                let base = buf.len();
                buf.resize(base + #val.len() * 4, 0);
                for (i, item) in #val.iter().enumerate() {
                    let tail = buf.len() - base;
                    dynssz::runtime::write_offset(buf, base + i * 4, tail)?;
                    #item_stmts
                }
            }
        })
    }

    /// Encoding of one element bound to `item`, through a helper when the
    /// element is an anonymous composite.
    fn element_encode_call(
        &mut self,
        elem: &Arc<TypeDescriptor>,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if elem.type_name.is_none() && is_composite(elem) {
            let helper = self.helper_idents(elem, dyn_ctx)?;
            let encode = helper.encode;
            return Ok(if helper.dynamic {
                quote!(#encode(spec, item, buf)?;)
            } else {
                quote!(#encode(item, buf)?;)
            });
        }
        self.encode_stmts(elem, &quote!(item), dyn_ctx)
    }

    // ------------------------------------------------------------------
    // decode
    // ------------------------------------------------------------------

    /// Expression decoding a value of `desc` from the byte slice `bytes`.
    fn decode_expr(
        &mut self,
        desc: &TypeDescriptor,
        bytes: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if let Some(name) = &desc.type_name {
            let name = ident(name);
            return Ok(if self.dyn_mode() && desc.has_size_expr {
                quote!(#name::decode_dynamic(spec, #bytes)?)
            } else {
                quote!(#name::decode(#bytes)?)
            });
        }
        Ok(match &desc.kind {
            DescriptorKind::Bool => quote!(dynssz::runtime::parse_bool(#bytes)?),
            DescriptorKind::Uint(UintKind::U8) => quote! {
                { dynssz::runtime::check_bytes(#bytes, 1)?; #bytes[0] }
            },
            DescriptorKind::Uint(UintKind::U16) => quote! {
                {
                    dynssz::runtime::check_bytes(#bytes, 2)?;
                    u16::from_le_bytes(<[u8; 2]>::try_from(#bytes).expect("length checked"))
                }
            },
            DescriptorKind::Uint(UintKind::U32) => quote! {
                {
                    dynssz::runtime::check_bytes(#bytes, 4)?;
                    u32::from_le_bytes(<[u8; 4]>::try_from(#bytes).expect("length checked"))
                }
            },
            DescriptorKind::Uint(UintKind::U64) => quote! {
                {
                    dynssz::runtime::check_bytes(#bytes, 8)?;
                    u64::from_le_bytes(<[u8; 8]>::try_from(#bytes).expect("length checked"))
                }
            },
            DescriptorKind::Uint(UintKind::U128) => quote! {
                {
                    dynssz::runtime::check_bytes(#bytes, 16)?;
                    U128::from_le_bytes::<16>(<[u8; 16]>::try_from(#bytes).expect("length checked"))
                }
            },
            DescriptorKind::Uint(UintKind::U256) => quote! {
                {
                    dynssz::runtime::check_bytes(#bytes, 32)?;
                    U256::from_le_bytes::<32>(<[u8; 32]>::try_from(#bytes).expect("length checked"))
                }
            },
            DescriptorKind::Vector { elem, length } => {
                let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                if desc.is_string {
                    quote!(dynssz::runtime::parse_padded_string(#bytes, #len)?)
                } else if desc.is_byte_seq {
                    quote! {
                        { dynssz::runtime::check_bytes(#bytes, #len)?; #bytes.to_vec() }
                    }
                } else if elem.static_size.is_some() {
                    let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                    let item = self.element_decode_call(elem, &quote!(chunk), dyn_ctx)?;
                    quote! {
                        {
                            let len = #len;
                            let elem_size = #elem_size;
                            dynssz::runtime::check_bytes(#bytes, len * elem_size)?;
                            let mut items = Vec::with_capacity(len);
                            for chunk in #bytes.chunks(elem_size.max(1)) {
                                items.push(#item);
                            }
                            items
                        }
                    }
                } else {
                    let item = self.element_decode_call(elem, &quote!(part), dyn_ctx)?;
                    quote! {
                        {
                            let parts = dynssz::runtime::subdivide_vector(#bytes, #len)?;
                            let mut items = Vec::with_capacity(parts.len());
                            for part in parts {
                                items.push(#item);
                            }
                            items
                        }
                    }
                }
            }
            DescriptorKind::List { elem, limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                if desc.is_string {
                    quote! {
                        {
                            dynssz::runtime::check_limit(#bytes.len(), #limit)?;
                            dynssz::runtime::parse_string(#bytes)?
                        }
                    }
                } else if desc.is_byte_seq {
                    quote! {
                        {
                            dynssz::runtime::check_limit(#bytes.len(), #limit)?;
                            #bytes.to_vec()
                        }
                    }
                } else if elem.static_size.is_some() {
                    let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                    let item = self.element_decode_call(elem, &quote!(chunk), dyn_ctx)?;
                    quote! {
                        {
                            let elem_size = #elem_size;
                            let count = dynssz::runtime::packed_count(#bytes, elem_size, #limit)?;
                            let mut items = Vec::with_capacity(count);
                            for chunk in #bytes.chunks(elem_size.max(1)) {
                                items.push(#item);
                            }
                            items
                        }
                    }
                } else {
                    let item = self.element_decode_call(elem, &quote!(part), dyn_ctx)?;
                    quote! {
                        {
                            let parts = dynssz::runtime::subdivide_list(#bytes, #limit)?;
                            let mut items = Vec::with_capacity(parts.len());
                            for part in parts {
                                items.push(#item);
                            }
                            items
                        }
                    }
                }
            }
            DescriptorKind::ProgressiveList { elem } => {
                let unbounded = quote!(None);
                if desc.is_byte_seq {
                    quote!(#bytes.to_vec())
                } else if elem.static_size.is_some() {
                    let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                    let item = self.element_decode_call(elem, &quote!(chunk), dyn_ctx)?;
                    quote! {
                        {
                            let elem_size = #elem_size;
                            let count = dynssz::runtime::packed_count(#bytes, elem_size, #unbounded)?;
                            let mut items = Vec::with_capacity(count);
                            for chunk in #bytes.chunks(elem_size.max(1)) {
                                items.push(#item);
                            }
                            items
                        }
                    }
                } else {
                    let item = self.element_decode_call(elem, &quote!(part), dyn_ctx)?;
                    quote! {
                        {
                            let parts = dynssz::runtime::subdivide_list(#bytes, #unbounded)?;
                            let mut items = Vec::with_capacity(parts.len());
                            for part in parts {
                                items.push(#item);
                            }
                            items
                        }
                    }
                }
            }
            DescriptorKind::Bitvector { bits } => {
                let bits = self.len_tokens(*bits, desc.size_expr.as_ref(), dyn_ctx);
                quote! {
                    {
                        let bits = #bits;
                        dynssz::runtime::check_bytes(#bytes, bits.div_ceil(8))?;
                        BitSeq::from_bytes(#bytes.to_vec(), bits)?
                    }
                }
            }
            DescriptorKind::Bitlist { limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                quote!(dynssz::runtime::parse_bitlist(#bytes, #limit)?)
            }
            DescriptorKind::ProgressiveBitlist => {
                quote!(dynssz::runtime::parse_bitlist(#bytes, None)?)
            }
            DescriptorKind::Wrapper { inner } => self.decode_expr(inner, bytes, dyn_ctx)?,
            DescriptorKind::Container(_)
            | DescriptorKind::ProgressiveContainer(_)
            | DescriptorKind::Union { .. }
            | DescriptorKind::Custom => {
                return Err(SszError::UnsupportedKind(
                    "anonymous container-like type in generated code".to_string(),
                ));
            }
        })
    }

    fn element_decode_call(
        &mut self,
        elem: &Arc<TypeDescriptor>,
        bytes: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if elem.type_name.is_none() && is_composite(elem) {
            let helper = self.helper_idents(elem, dyn_ctx)?;
            let decode = helper.decode;
            return Ok(if helper.dynamic {
                quote!(#decode(spec, #bytes)?)
            } else {
                quote!(#decode(#bytes)?)
            });
        }
        self.decode_expr(elem, bytes, dyn_ctx)
    }

    // ------------------------------------------------------------------
    // size
    // ------------------------------------------------------------------

    /// Size expression for a dynamically sized value `val`.
    fn value_size_expr(
        &mut self,
        desc: &TypeDescriptor,
        val: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if let Some(static_size) = desc.static_size {
            if !(dyn_ctx && desc.has_size_expr) {
                let static_size = lit(static_size);
                return Ok(quote!(#static_size));
            }
            return self.field_size_tokens(desc, dyn_ctx);
        }
        if desc.type_name.is_some() {
            return Ok(if self.dyn_mode() && desc.has_size_expr {
                quote!(#val.size_dynamic(spec)?)
            } else {
                quote!(#val.size())
            });
        }
        Ok(match &desc.kind {
            DescriptorKind::List { elem, .. } | DescriptorKind::ProgressiveList { elem } => {
                if desc.is_byte_seq || desc.is_string {
                    quote!(#val.len())
                } else if let Some(elem_size) = elem.static_size {
                    if dyn_ctx && elem.has_size_expr {
                        let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                        quote!((#val.len() * #elem_size))
                    } else {
                        let elem_size = lit(elem_size);
                        quote!((#val.len() * #elem_size))
                    }
                } else {
                    let item_size = self.element_size_call(elem, dyn_ctx)?;
                    quote! {
                        {
                            let mut total = 0usize;
                            for item in #val.iter() {
                                total += 4 + #item_size;
                            }
                            total
                        }
                    }
                }
            }
            DescriptorKind::Vector { elem, length } => {
                // Only reachable for vectors of dynamic elements.
                let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                let item_size = self.element_size_call(elem, dyn_ctx)?;
                quote! {
                    {
                        let mut total = #len * 4;
                        for item in #val.iter() {
                            total += #item_size;
                        }
                        total
                    }
                }
            }
            DescriptorKind::Bitlist { .. } | DescriptorKind::ProgressiveBitlist => {
                quote!(((#val.len() + 1).div_ceil(8)))
            }
            DescriptorKind::Wrapper { inner } => self.value_size_expr(inner, val, dyn_ctx)?,
            _ => {
                return Err(SszError::UnsupportedKind(
                    "anonymous container-like type in generated code".to_string(),
                ));
            }
        })
    }

    fn element_size_call(
        &mut self,
        elem: &Arc<TypeDescriptor>,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if elem.type_name.is_none() && is_composite(elem) {
            let helper = self.helper_idents(elem, dyn_ctx)?;
            let size = helper.size;
            return Ok(if helper.dynamic {
                quote!(#size(spec, item)?)
            } else {
                quote!(#size(item))
            });
        }
        self.value_size_expr(elem, &quote!(item), dyn_ctx)
    }

    /// A whole `size` (or `size_dynamic`) body for a value expression.
    fn value_size_body(
        &mut self,
        desc: &TypeDescriptor,
        val: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let expr = self.value_size_expr(desc, val, dyn_ctx)?;
        Ok(if dyn_ctx {
            quote!(Ok(#expr))
        } else {
            quote!(#expr)
        })
    }

    fn container_size_body(
        &mut self,
        desc: &TypeDescriptor,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if let Some(static_size) = desc.static_size {
            if !(dyn_ctx && desc.has_size_expr) {
                let static_size = lit(static_size);
                return Ok(if dyn_ctx {
                    quote!(Ok(#static_size))
                } else {
                    quote!(#static_size)
                });
            }
        }
        let mut terms = Vec::new();
        for field in &container.fields {
            let fid = ident(&field.name);
            if field.desc.static_size.is_some() {
                terms.push(self.field_size_tokens(&field.desc, dyn_ctx)?);
            } else {
                let part = self.value_size_expr(&field.desc, &quote!((&self.#fid)), dyn_ctx)?;
                terms.push(quote!(4 + #part));
            }
        }
        let total = quote!(0usize #(+ #terms)*);
        Ok(if dyn_ctx {
            quote!(Ok(#total))
        } else {
            quote!(#total)
        })
    }

    // ------------------------------------------------------------------
    // containers: encode/decode bodies
    // ------------------------------------------------------------------

    fn container_encode_body(
        &mut self,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let mut head_stmts = Vec::new();
        let mut tail_stmts = Vec::new();
        let mut slot_index = 0usize;
        for field in &container.fields {
            let fid = ident(&field.name);
            let val = quote!((&self.#fid));
            if field.desc.static_size.is_some() {
                head_stmts.push(self.encode_stmts(&field.desc, &val, dyn_ctx)?);
            } else {
                let slot = ident(&format!("slot_{slot_index}"));
                slot_index += 1;
                head_stmts.push(quote! {
                    let #slot = buf.len();
                    buf.extend_from_slice(&[0u8; 4]);
                });
                let stmts = self.encode_stmts(&field.desc, &val, dyn_ctx)?;
                tail_stmts.push(quote! {
                    {
                        let tail = buf.len() - start;
                        dynssz::runtime::write_offset(buf, #slot, tail)?;
                        #stmts
                    }
                });
            }
        }
        let start = if tail_stmts.is_empty() {
            TokenStream::new()
        } else {
            quote!(let start = buf.len();)
        };
        Ok(quote! {
            #start
            #(#head_stmts)*
            #(#tail_stmts)*
            Ok(())
        })
    }

    fn container_decode_body(
        &mut self,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let dynamic_count = container
            .fields
            .iter()
            .filter(|field| field.is_dynamic())
            .count();

        let mut head_terms = Vec::new();
        for field in &container.fields {
            head_terms.push(self.field_size_tokens(&field.desc, dyn_ctx)?);
        }
        let head = quote!(0usize #(+ #head_terms)*);

        let mut pass1 = Vec::new();
        let mut pass2 = Vec::new();
        let mut field_idents = Vec::new();
        let mut dynamic_index = 0usize;
        for field in &container.fields {
            let fid = ident(&field.name);
            field_idents.push(fid.clone());
            if field.desc.static_size.is_some() {
                let size = self.field_size_tokens(&field.desc, dyn_ctx)?;
                let expr = self.decode_expr(&field.desc, &quote!(bytes), dyn_ctx)?;
                pass1.push(quote! {
                    let #fid = {
                        let field_size = #size;
                        let bytes = dynssz::runtime::take(buf, pos, field_size)?;
                        pos += field_size;
                        #expr
                    };
                });
            } else {
                pass1.push(quote! {
                    offsets.push(dynssz::runtime::read_offset(buf, pos)?);
                    pos += 4;
                });
                let k = lit(dynamic_index);
                let expr = self.decode_expr(&field.desc, &quote!(bytes), dyn_ctx)?;
                pass2.push(quote! {
                    let #fid = {
                        let start = offsets[#k];
                        let end = offsets.get(#k + 1).copied().unwrap_or(buf.len());
                        let bytes = &buf[start..end];
                        #expr
                    };
                });
                dynamic_index += 1;
            }
        }

        let exact_check = if dynamic_count == 0 {
            quote!(dynssz::runtime::check_bytes(buf, head)?;)
        } else {
            quote!(dynssz::runtime::check_head(buf, head)?;)
        };
        Ok(quote! {
            let head: usize = #head;
            #exact_check
            let mut pos = 0usize;
            let mut offsets: Vec<usize> = Vec::with_capacity(#dynamic_count);
            #(#pass1)*
            let _ = pos;
            dynssz::runtime::validate_offsets(&offsets, head, buf.len())?;
            #(#pass2)*
            Ok(Self { #(#field_idents),* })
        })
    }

    // ------------------------------------------------------------------
    // hash
    // ------------------------------------------------------------------

    /// Expression producing the `Hash256` root of `val`.
    fn root_expr(
        &mut self,
        desc: &TypeDescriptor,
        val: &TokenStream,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if desc.type_name.is_some() {
            return Ok(if self.dyn_mode() && desc.has_size_expr {
                quote!(#val.hash_tree_root_dynamic(spec)?)
            } else {
                quote!(#val.hash_tree_root()?)
            });
        }
        Ok(match &desc.kind {
            DescriptorKind::Bool => quote!(Hash256::right_padding_from(&[u8::from(*#val)])),
            DescriptorKind::Uint(UintKind::U8) => quote!(Hash256::right_padding_from(&[*#val])),
            DescriptorKind::Uint(UintKind::U16)
            | DescriptorKind::Uint(UintKind::U32)
            | DescriptorKind::Uint(UintKind::U64) => {
                quote!(Hash256::right_padding_from(&#val.to_le_bytes()))
            }
            DescriptorKind::Uint(UintKind::U128) => {
                quote!(Hash256::right_padding_from(&#val.to_le_bytes::<16>()))
            }
            DescriptorKind::Uint(UintKind::U256) => {
                quote!(Hash256::from(#val.to_le_bytes::<32>()))
            }
            DescriptorKind::Vector { elem, length } => {
                if desc.is_byte_seq || desc.is_string {
                    let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                    let payload = if desc.is_string {
                        quote!(#val.as_bytes())
                    } else {
                        quote!(#val)
                    };
                    quote!(merkle_root::<Sha256Engine>(#payload, #len.div_ceil(32))?)
                } else if is_basic(elem) {
                    let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                    let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                    let pack = self.pack_stmts(elem)?;
                    quote! {
                        {
                            let mut packed = Vec::new();
                            for item in #val.iter() { #pack }
                            merkle_root::<Sha256Engine>(&packed, (#len * #elem_size).div_ceil(32))?
                        }
                    }
                } else {
                    let len = self.len_tokens(*length, desc.size_expr.as_ref(), dyn_ctx);
                    let item_root = self.element_root_call(elem, dyn_ctx)?;
                    quote! {
                        {
                            let mut roots = Vec::with_capacity(#val.len());
                            for item in #val.iter() { roots.push(#item_root); }
                            merkleize_chunks::<Sha256Engine>(
                                &roots,
                                #len.next_power_of_two().max(1),
                            )?
                        }
                    }
                }
            }
            DescriptorKind::List { elem, limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                if desc.is_byte_seq || desc.is_string {
                    let payload = if desc.is_string {
                        quote!(#val.as_bytes())
                    } else {
                        quote!(#val.as_slice())
                    };
                    quote! {
                        {
                            let payload: &[u8] = #payload;
                            let min_chunks =
                                #limit.map(|l: usize| l.div_ceil(32)).unwrap_or(0);
                            let root = merkle_root::<Sha256Engine>(payload, min_chunks)?;
                            mix_in_length::<Sha256Engine>(&root, payload.len())
                        }
                    }
                } else if is_basic(elem) {
                    let elem_size = self.field_size_tokens(elem, dyn_ctx)?;
                    let pack = self.pack_stmts(elem)?;
                    quote! {
                        {
                            let elem_size = #elem_size;
                            let mut packed = Vec::new();
                            for item in #val.iter() { #pack }
                            let min_chunks = #limit
                                .map(|l: usize| (l * elem_size).div_ceil(32))
                                .unwrap_or(0);
                            let root = merkle_root::<Sha256Engine>(&packed, min_chunks)?;
                            mix_in_length::<Sha256Engine>(&root, #val.len())
                        }
                    }
                } else {
                    let item_root = self.element_root_call(elem, dyn_ctx)?;
                    quote! {
                        {
                            let mut roots = Vec::with_capacity(#val.len());
                            for item in #val.iter() { roots.push(#item_root); }
                            let chunk_limit = #limit
                                .map(|l: usize| l.next_power_of_two().max(1))
                                .unwrap_or(0);
                            let root = merkleize_chunks::<Sha256Engine>(&roots, chunk_limit)?;
                            mix_in_length::<Sha256Engine>(&root, #val.len())
                        }
                    }
                }
            }
            DescriptorKind::ProgressiveList { elem } => {
                if desc.is_byte_seq {
                    quote! {
                        {
                            let chunks = dynssz::merkle::pack_bytes(#val);
                            let root = merkleize_progressive::<Sha256Engine>(&chunks)?;
                            mix_in_length::<Sha256Engine>(&root, #val.len())
                        }
                    }
                } else if is_basic(elem) {
                    let pack = self.pack_stmts(elem)?;
                    quote! {
                        {
                            let mut packed = Vec::new();
                            for item in #val.iter() { #pack }
                            let chunks = dynssz::merkle::pack_bytes(&packed);
                            let root = merkleize_progressive::<Sha256Engine>(&chunks)?;
                            mix_in_length::<Sha256Engine>(&root, #val.len())
                        }
                    }
                } else {
                    let item_root = self.element_root_call(elem, dyn_ctx)?;
                    quote! {
                        {
                            let mut roots = Vec::with_capacity(#val.len());
                            for item in #val.iter() { roots.push(#item_root); }
                            let root = merkleize_progressive::<Sha256Engine>(&roots)?;
                            mix_in_length::<Sha256Engine>(&root, #val.len())
                        }
                    }
                }
            }
            DescriptorKind::Bitvector { bits } => {
                let bits = self.len_tokens(*bits, desc.size_expr.as_ref(), dyn_ctx);
                quote! {
                    merkle_root::<Sha256Engine>(#val.as_bytes(), #bits.div_ceil(8).div_ceil(32))?
                }
            }
            DescriptorKind::Bitlist { limit } => {
                let limit = self.limit_tokens(*limit, desc.max_expr.as_ref(), dyn_ctx);
                quote! {
                    {
                        let min_chunks = #limit
                            .map(|l: usize| l.div_ceil(8).div_ceil(32))
                            .unwrap_or(0);
                        let root = merkle_root::<Sha256Engine>(#val.as_bytes(), min_chunks)?;
                        mix_in_length::<Sha256Engine>(&root, #val.len())
                    }
                }
            }
            DescriptorKind::ProgressiveBitlist => quote! {
                {
                    let chunks = dynssz::merkle::pack_bytes(#val.as_bytes());
                    let root = merkleize_progressive::<Sha256Engine>(&chunks)?;
                    mix_in_length::<Sha256Engine>(&root, #val.len())
                }
            },
            DescriptorKind::Wrapper { inner } => self.root_expr(inner, val, dyn_ctx)?,
            DescriptorKind::Container(_)
            | DescriptorKind::ProgressiveContainer(_)
            | DescriptorKind::Union { .. }
            | DescriptorKind::Custom => {
                return Err(SszError::UnsupportedKind(
                    "anonymous container-like type in generated code".to_string(),
                ));
            }
        })
    }

    /// Statements appending `item`'s packed encoding to `packed`.
    fn pack_stmts(&self, elem: &TypeDescriptor) -> Result<TokenStream, SszError> {
        Ok(match &elem.kind {
            DescriptorKind::Bool => quote!(packed.push(u8::from(*item));),
            DescriptorKind::Uint(UintKind::U8) => quote!(packed.push(*item);),
            DescriptorKind::Uint(UintKind::U16)
            | DescriptorKind::Uint(UintKind::U32)
            | DescriptorKind::Uint(UintKind::U64) => {
                quote!(packed.extend_from_slice(&item.to_le_bytes());)
            }
            DescriptorKind::Uint(UintKind::U128) => {
                quote!(packed.extend_from_slice(&item.to_le_bytes::<16>());)
            }
            DescriptorKind::Uint(UintKind::U256) => {
                quote!(packed.extend_from_slice(&item.to_le_bytes::<32>());)
            }
            _ => {
                return Err(SszError::UnsupportedKind(
                    "packing a non-basic element".to_string(),
                ));
            }
        })
    }

    fn element_root_call(
        &mut self,
        elem: &Arc<TypeDescriptor>,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        if elem.type_name.is_none() && is_composite(elem) {
            let helper = self.helper_idents(elem, dyn_ctx)?;
            let hash = helper.hash;
            return Ok(if helper.dynamic {
                quote!(#hash(spec, item)?)
            } else {
                quote!(#hash(item)?)
            });
        }
        self.root_expr(elem, &quote!(item), dyn_ctx)
    }

    fn container_hash_body(
        &mut self,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let mut pushes = Vec::new();
        for field in &container.fields {
            let fid = ident(&field.name);
            let root = self.root_expr(&field.desc, &quote!((&self.#fid)), dyn_ctx)?;
            pushes.push(quote!(roots.push(#root);));
        }
        let count = container.fields.len();
        let pow2 = lit(count.next_power_of_two().max(1));
        Ok(quote! {
            let mut roots = Vec::with_capacity(#count);
            #(#pushes)*
            Ok(merkleize_chunks::<Sha256Engine>(&roots, #pow2)?)
        })
    }

    fn progressive_container_hash_body(
        &mut self,
        container: &ContainerDescriptor,
        dyn_ctx: bool,
    ) -> Result<TokenStream, SszError> {
        let max_index = container
            .fields
            .last()
            .map(|field| field.index as usize)
            .unwrap_or(0);
        let leaf_count = lit(max_index + 1);
        let mut assigns = Vec::new();
        for field in &container.fields {
            let fid = ident(&field.name);
            let index = lit(field.index as usize);
            let root = self.root_expr(&field.desc, &quote!((&self.#fid)), dyn_ctx)?;
            assigns.push(quote!(leaves[#index] = #root;));
        }
        let active = container.active_fields.iter().map(|byte| {
            let byte = Literal::u8_unsuffixed(*byte);
            quote!(#byte)
        });
        Ok(quote! {
            let mut leaves = vec![Hash256::ZERO; #leaf_count];
            #(#assigns)*
            let root = merkleize_progressive::<Sha256Engine>(&leaves)?;
            Ok(mix_in_active_fields::<Sha256Engine>(&root, &[#(#active),*]))
        })
    }

    // ------------------------------------------------------------------
    // helpers for anonymous composite elements
    // ------------------------------------------------------------------

    fn helper_idents(
        &mut self,
        desc: &Arc<TypeDescriptor>,
        dyn_ctx: bool,
    ) -> Result<HelperFns, SszError> {
        let dynamic = dyn_ctx && desc.has_size_expr;
        let key = content_key(desc);
        let fns = HelperFns {
            encode: ident(&format!("encode_{key}")),
            decode: ident(&format!("decode_{key}")),
            size: ident(&format!("size_{key}")),
            hash: ident(&format!("hash_{key}")),
            dynamic,
        };
        if self.helpers.contains_key(&key) {
            return Ok(fns);
        }
        // Reserve the slot first so self-similar nesting cannot recurse
        // forever.
        self.helpers.insert(key.clone(), TokenStream::new());

        let ty = self.rust_type(desc)?;
        let encode_stmts = self.encode_stmts(desc, &quote!(value), dynamic)?;
        let decode_expr = self.decode_expr(desc, &quote!(bytes), dynamic)?;
        let root = self.root_expr(desc, &quote!(value), dynamic)?;
        let encode = &fns.encode;
        let decode = &fns.decode;
        let size = &fns.size;
        let hash = &fns.hash;
        let size_fn = if desc.static_size.is_some() && !dynamic {
            let size_lit = lit(desc.static_size.expect("checked static"));
            quote! {
                #[allow(dead_code)]
                fn #size(value: &#ty) -> usize {
                    let _ = value;
                    #size_lit
                }
            }
        } else if dynamic {
            let expr = self.value_size_expr(desc, &quote!(value), dynamic)?;
            quote! {
                #[allow(dead_code)]
                fn #size(spec: &dynssz::SpecResolver, value: &#ty) -> Result<usize, SszError> {
                    Ok(#expr)
                }
            }
        } else {
            let expr = self.value_size_expr(desc, &quote!(value), dynamic)?;
            quote! {
                #[allow(dead_code)]
                fn #size(value: &#ty) -> usize {
                    #expr
                }
            }
        };
        let tokens = if dynamic {
            quote! {
                fn #encode(
                    spec: &dynssz::SpecResolver,
                    value: &#ty,
                    buf: &mut Vec<u8>,
                ) -> Result<(), SszError> {
                    #encode_stmts
                    Ok(())
                }
                fn #decode(spec: &dynssz::SpecResolver, bytes: &[u8]) -> Result<#ty, SszError> {
                    Ok(#decode_expr)
                }
                #size_fn
                fn #hash(spec: &dynssz::SpecResolver, value: &#ty) -> Result<Hash256, SszError> {
                    Ok(#root)
                }
            }
        } else {
            quote! {
                fn #encode(value: &#ty, buf: &mut Vec<u8>) -> Result<(), SszError> {
                    #encode_stmts
                    Ok(())
                }
                fn #decode(bytes: &[u8]) -> Result<#ty, SszError> {
                    Ok(#decode_expr)
                }
                #size_fn
                fn #hash(value: &#ty) -> Result<Hash256, SszError> {
                    Ok(#root)
                }
            }
        };
        self.helpers.insert(key, tokens);
        Ok(fns)
    }
}

struct HelperFns {
    encode: Ident,
    decode: Ident,
    size: Ident,
    hash: Ident,
    dynamic: bool,
}

fn is_basic(desc: &TypeDescriptor) -> bool {
    matches!(desc.kind, DescriptorKind::Bool | DescriptorKind::Uint(_))
}

fn is_composite(desc: &TypeDescriptor) -> bool {
    matches!(
        desc.kind,
        DescriptorKind::Vector { .. }
            | DescriptorKind::List { .. }
            | DescriptorKind::ProgressiveList { .. }
    ) && !desc.is_byte_seq
        && !desc.is_string
}
