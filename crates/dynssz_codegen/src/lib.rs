//! # dynssz codegen
//!
//! Emits specialized, statically typed SSZ routines from compiled
//! [`dynssz`] descriptors: for every named type it generates the Rust type
//! definition plus `encode`/`decode`/`size`/`hash_tree_root` inherent
//! methods mirroring the reflective engine, with reflection cost removed.
//!
//! Two emission modes:
//!
//! - [`SpecMode::Baked`] resolves every size expression against the
//!   generator's resolver and emits integer literals; the generated code
//!   needs no resolver at call time.
//! - [`SpecMode::Dynamic`] emits `*_dynamic` routines taking a
//!   [`SpecResolver`](dynssz::SpecResolver) wherever a subtree carries a
//!   size expression; spec-independent types keep their static shape.
//!
//! Byte output of generated and reflective paths is identical for any value
//! the reflective engine accepts.

use std::sync::Arc;

use dynssz::{DynSsz, SszError, TypeDef, TypeExpr};
use prettyplease::unparse;
use proc_macro2::TokenStream;
use quote::quote;
use syn::parse_str;

mod emit;

use emit::Emitter;

/// How the generated routines obtain spec-dependent sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecMode {
    /// Bake every size into an integer literal at generation time.
    #[default]
    Baked,
    /// Resolve size expressions at call time through a resolver argument.
    Dynamic,
}

/// Generator options.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    /// Emission mode.
    pub mode: SpecMode,
    /// Generate bodies even for types carrying a host-provided codec
    /// (normally such types are treated as externally implemented).
    pub no_fast_path: bool,
}

/// Descriptor-driven source generator.
#[derive(Debug)]
pub struct Generator {
    codec: DynSsz,
    options: GeneratorOptions,
}

impl Generator {
    /// Creates a generator resolving expressions against `spec`.
    pub fn new(spec: impl IntoIterator<Item = (String, u64)>, options: GeneratorOptions) -> Self {
        Self {
            codec: DynSsz::new(spec),
            options,
        }
    }

    /// Generates source text for `types`.
    ///
    /// Referenced named types that are not listed are treated as already
    /// implemented elsewhere and are called by name. The output is a
    /// self-contained module body depending only on `dynssz`.
    pub fn generate(&self, types: &[Arc<TypeDef>]) -> Result<String, SszError> {
        let mut emitter = Emitter::new(self.options);
        let mut items: Vec<TokenStream> = Vec::new();
        for def in types {
            let desc = self.codec.descriptor(&TypeExpr::Named(def.clone()))?;
            // Same gate as the reflective engine: a host-provided codec is
            // only authoritative for spec-independent subtrees, so a type
            // whose descriptor carries a size expression still gets a body.
            if desc.fast_path().is_some() && !self.options.no_fast_path {
                continue;
            }
            items.push(emitter.emit_type(def, &desc)?);
        }
        let helpers = emitter.take_helpers();
        let tokens = quote! {
            #[allow(unused_imports)]
            use dynssz::merkle::{
                Sha256Engine, merkle_root, merkleize_chunks, merkleize_progressive,
                mix_in_active_fields, mix_in_length, mix_in_selector,
            };
            #[allow(unused_imports)]
            use dynssz::{BitSeq, Hash256, SszError, U128, U256};
            #(#items)*
            #(#helpers)*
        };
        let file = parse_str::<syn::File>(&tokens.to_string())
            .map_err(|err| SszError::UnsupportedKind(format!("generated code: {err}")))?;
        Ok(unparse(&file))
    }
}
