//! Generator integration tests.
//!
//! `Generator::generate` parses its own output with `syn` before
//! returning, so every passing test here also proves the emitted source is
//! syntactically valid Rust.

use std::sync::Arc;

use dynssz::{Annotations, CodecOverride, Hash256, SszError, TypeDef, TypeExpr, Value};
use dynssz_codegen::{Generator, GeneratorOptions, SpecMode};

fn schema() -> Vec<Arc<TypeDef>> {
    let checkpoint = TypeDef::container("Checkpoint")
        .field("epoch", TypeExpr::U64, Annotations::none())
        .field("root", TypeExpr::bytes(32), Annotations::none())
        .build();
    let payload = TypeDef::union(
        "Payload",
        [
            ("word".to_string(), TypeExpr::U32, Annotations::none()),
            ("blob".to_string(), TypeExpr::byte_seq(), Annotations::none().max("256")),
        ],
    );
    let attestation = TypeDef::container("Attestation")
        .field(
            "aggregation_bits",
            TypeExpr::byte_seq(),
            Annotations::none().kind("bitlist").max("2048"),
        )
        .field("source", TypeExpr::Named(checkpoint.clone()), Annotations::none())
        .field("target", TypeExpr::Named(checkpoint.clone()), Annotations::none())
        .field("payload", TypeExpr::Named(payload.clone()), Annotations::none())
        .field(
            "shards",
            TypeExpr::seq(TypeExpr::seq(TypeExpr::U64)),
            Annotations::none().max("16,128"),
        )
        .field(
            "backup_shards",
            TypeExpr::seq(TypeExpr::seq(TypeExpr::U64)),
            Annotations::none().max("16,128"),
        )
        .build();
    vec![checkpoint, payload, attestation]
}

#[test]
fn generates_every_requested_type() {
    let source = Generator::new([], GeneratorOptions::default())
        .generate(&schema())
        .unwrap();
    assert!(source.contains("pub struct Checkpoint"));
    assert!(source.contains("pub enum Payload"));
    assert!(source.contains("pub struct Attestation"));
    // Union variants are camel-cased and carry their payloads.
    assert!(source.contains("Word(u32)"));
    assert!(source.contains("Blob(Vec<u8>)"));
    // Nested named types are called through their generated methods.
    assert!(source.contains(".encode(buf)?"));
    assert!(source.contains("Checkpoint::decode("));
}

#[test]
fn anonymous_composites_become_shared_helpers() {
    let source = Generator::new([], GeneratorOptions::default())
        .generate(&schema())
        .unwrap();
    // `shards` and `backup_shards` share one element shape, so exactly one
    // encode helper is emitted for it.
    let helper_count = source.matches("fn encode_").count();
    assert_eq!(helper_count, 1, "helpers must deduplicate by content key:\n{source}");
    assert!(source.contains("fn decode_"));
    assert!(source.contains("fn hash_"));
}

#[test]
fn output_is_deterministic() {
    let a = Generator::new([], GeneratorOptions::default())
        .generate(&schema())
        .unwrap();
    let b = Generator::new([], GeneratorOptions::default())
        .generate(&schema())
        .unwrap();
    assert_eq!(a, b);
}

#[test]
fn baked_mode_resolves_spec_expressions_to_literals() {
    let batch = TypeDef::container("HistoricalBatch")
        .field(
            "block_roots",
            TypeExpr::array(TypeExpr::bytes(32), 8192),
            Annotations::none().dyn_size("SLOTS_PER_HISTORICAL_ROOT,?"),
        )
        .build();
    let source = Generator::new(
        [("SLOTS_PER_HISTORICAL_ROOT".to_string(), 64u64)],
        GeneratorOptions::default(),
    )
    .generate(&[batch])
    .unwrap();
    assert!(source.contains("64"));
    assert!(!source.contains("SLOTS_PER_HISTORICAL_ROOT"));
    assert!(!source.contains("resolve_expr"));
}

#[test]
fn dynamic_mode_keeps_expressions_in_the_output() {
    let batch = TypeDef::container("HistoricalBatch")
        .field(
            "block_roots",
            TypeExpr::array(TypeExpr::bytes(32), 8192),
            Annotations::none().dyn_size("SLOTS_PER_HISTORICAL_ROOT,?"),
        )
        .build();
    let source = Generator::new(
        [("SLOTS_PER_HISTORICAL_ROOT".to_string(), 64u64)],
        GeneratorOptions {
            mode: SpecMode::Dynamic,
            ..Default::default()
        },
    )
    .generate(&[batch])
    .unwrap();
    assert!(source.contains("SLOTS_PER_HISTORICAL_ROOT"));
    assert!(source.contains("resolve_expr"));
    assert!(source.contains("decode_dynamic"));
    assert!(source.contains("size_dynamic"));
}

#[derive(Debug)]
struct NoopCodec;

impl CodecOverride for NoopCodec {
    fn ssz_size(&self, _value: &Value) -> Result<usize, SszError> {
        Ok(0)
    }

    fn encode(&self, _value: &Value, _buf: &mut Vec<u8>) -> Result<(), SszError> {
        Ok(())
    }

    fn decode(&self, _bytes: &[u8]) -> Result<Value, SszError> {
        Ok(Value::Bytes(Vec::new()))
    }

    fn hash_tree_root(&self, _value: &Value) -> Result<Hash256, SszError> {
        Ok(Hash256::ZERO)
    }
}

#[test]
fn override_with_size_expression_still_generates_a_body() {
    // Same gate as the reflective engine: an override only stands in for
    // spec-independent subtrees.
    let fast = TypeDef::container("FastOnly")
        .field("word", TypeExpr::U64, Annotations::none())
        .codec_override(Arc::new(NoopCodec))
        .build();
    let spec_bound = TypeDef::container("SpecBound")
        .field(
            "roots",
            TypeExpr::array(TypeExpr::bytes(32), 8192),
            Annotations::none().dyn_size("ROOT_COUNT,?"),
        )
        .codec_override(Arc::new(NoopCodec))
        .build();
    let generator = Generator::new(
        [("ROOT_COUNT".to_string(), 4u64)],
        GeneratorOptions {
            mode: SpecMode::Dynamic,
            ..Default::default()
        },
    );
    let source = generator.generate(&[fast, spec_bound]).unwrap();

    // The expression-free type keeps its hand-written fast path.
    assert!(!source.contains("struct FastOnly"));
    // The spec-bound type is generated despite its override.
    assert!(source.contains("pub struct SpecBound"));
    assert!(source.contains("encode_dynamic"));
}

#[test]
fn progressive_container_bakes_active_fields() {
    let sparse = TypeDef::progressive_container("Sparse")
        .field("a", TypeExpr::U64, Annotations::none().index("0"))
        .field("g", TypeExpr::U16, Annotations::none().index("6"))
        .build();
    let source = Generator::new([], GeneratorOptions::default())
        .generate(&[sparse])
        .unwrap();
    assert!(source.contains("merkleize_progressive"));
    assert!(source.contains("mix_in_active_fields"));
    // bit 0 and bit 6 set
    assert!(source.contains("65"));
}
