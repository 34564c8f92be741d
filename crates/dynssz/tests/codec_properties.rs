//! Round-trip, hash-stability, and limit-enforcement properties.

use rand::{Rng, SeedableRng, rngs::StdRng};

use dynssz::{Annotations, BitSeq, DynSsz, SszError, TypeDef, TypeExpr, Value};

fn beacon_ish_type() -> TypeExpr {
    let checkpoint = TypeDef::container("Checkpoint")
        .field("epoch", TypeExpr::U64, Annotations::none())
        .field("root", TypeExpr::bytes(32), Annotations::none())
        .build();
    TypeExpr::Named(
        TypeDef::container("Attestation")
            .field(
                "aggregation_bits",
                TypeExpr::byte_seq(),
                Annotations::none().kind("bitlist").max("2048"),
            )
            .field("source", TypeExpr::Named(checkpoint.clone()), Annotations::none())
            .field("target", TypeExpr::Named(checkpoint), Annotations::none())
            .field(
                "signature",
                TypeExpr::bytes(96),
                Annotations::none(),
            )
            .field(
                "extra",
                TypeExpr::seq(TypeExpr::byte_seq()),
                Annotations::none().max("8,64"),
            )
            .build(),
    )
}

fn random_value(rng: &mut StdRng) -> Value {
    let checkpoint = |rng: &mut StdRng| {
        Value::Container(vec![
            Value::U64(rng.r#gen()),
            Value::Bytes((0..32).map(|_| rng.r#gen()).collect()),
        ])
    };
    let bit_len = rng.gen_range(0..100);
    Value::Container(vec![
        Value::Bits(BitSeq::from_bools((0..bit_len).map(|_| rng.r#gen()))),
        checkpoint(rng),
        checkpoint(rng),
        Value::Bytes((0..96).map(|_| rng.r#gen()).collect()),
        Value::Seq(
            (0..rng.gen_range(0..8))
                .map(|_| {
                    Value::Bytes((0..rng.gen_range(0..64)).map(|_| rng.r#gen()).collect())
                })
                .collect(),
        ),
    ])
}

#[test]
fn random_round_trips() {
    let codec = DynSsz::new([]);
    let ty = beacon_ish_type();
    let mut rng = StdRng::seed_from_u64(0x5552);
    for _ in 0..50 {
        let value = random_value(&mut rng);
        let bytes = codec.marshal(&ty, &value).unwrap();
        assert_eq!(codec.size(&ty, &value).unwrap(), bytes.len());
        let decoded = codec.unmarshal(&ty, &bytes).unwrap();
        assert_eq!(decoded, value);
        // Hash stability: the root only depends on the canonical image.
        assert_eq!(
            codec.hash_tree_root(&ty, &decoded).unwrap(),
            codec.hash_tree_root(&ty, &value).unwrap()
        );
    }
}

#[test]
fn streaming_paths_match_buffered_paths() {
    let codec = DynSsz::new([]);
    let ty = beacon_ish_type();
    let mut rng = StdRng::seed_from_u64(0x5353);
    for _ in 0..20 {
        let value = random_value(&mut rng);
        let buffered = codec.marshal(&ty, &value).unwrap();

        let mut streamed = Vec::new();
        let written = codec.marshal_to(&ty, &value, &mut streamed).unwrap();
        assert_eq!(written, buffered.len());
        assert_eq!(streamed, buffered);

        let mut source: &[u8] = &buffered;
        let decoded = codec
            .unmarshal_from(&ty, &mut source, Some(buffered.len()))
            .unwrap();
        assert_eq!(decoded, value);

        let mut source: &[u8] = &buffered;
        let decoded = codec.unmarshal_from(&ty, &mut source, None).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn list_limits_bind_both_directions() {
    let codec = DynSsz::new([]);
    let ty = TypeExpr::Named(
        TypeDef::container("Capped")
            .field(
                "items",
                TypeExpr::seq(TypeExpr::U64),
                Annotations::none().max("4"),
            )
            .build(),
    );

    let full = Value::Container(vec![Value::Seq(vec![Value::U64(1); 4])]);
    let bytes = codec.marshal(&ty, &full).unwrap();
    assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), full);

    let over = Value::Container(vec![Value::Seq(vec![Value::U64(1); 5])]);
    assert!(matches!(
        codec.marshal(&ty, &over),
        Err(SszError::ListTooBig { len: 5, limit: 4 })
    ));
    assert!(matches!(
        codec.size(&ty, &over),
        Err(SszError::ListTooBig { .. })
    ));
    assert!(matches!(
        codec.hash_tree_root(&ty, &over),
        Err(SszError::ListTooBig { .. })
    ));

    // A wire image with five elements: head offset 4, then 40 bytes.
    let mut wire = Vec::new();
    wire.extend_from_slice(&4u32.to_le_bytes());
    wire.extend_from_slice(&[0u8; 40]);
    assert!(matches!(
        codec.unmarshal(&ty, &wire),
        Err(SszError::ListTooBig { len: 5, limit: 4 })
    ));
}

#[test]
fn bitlist_sentinel_round_trip() {
    let codec = DynSsz::new([]);
    let ty = TypeExpr::Named(
        TypeDef::container("BitsOnly")
            .field(
                "bits",
                TypeExpr::byte_seq(),
                Annotations::none().kind("bitlist").max("64"),
            )
            .build(),
    );

    // Eight data bits force the sentinel into a second byte.
    let bits = BitSeq::from_bools([true, false, true, false, true, false, true, false]);
    let value = Value::Container(vec![Value::Bits(bits)]);
    let bytes = codec.marshal(&ty, &value).unwrap();
    assert_eq!(&bytes[bytes.len() - 2..], &[0b0101_0101, 0b0000_0001]);
    assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), value);

    // Three data bits share their byte with the sentinel.
    let bits = BitSeq::from_bools([true, true, false]);
    let value = Value::Container(vec![Value::Bits(bits)]);
    let bytes = codec.marshal(&ty, &value).unwrap();
    assert_eq!(*bytes.last().unwrap(), 0b0000_1011);
    assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), value);
}

#[test]
fn spec_determinism_ignores_unused_names() {
    let ty = || {
        TypeExpr::Named(
            TypeDef::container("Deterministic")
                .field(
                    "roots",
                    TypeExpr::seq(TypeExpr::bytes(32)),
                    Annotations::none().dyn_max("ROOT_LIMIT"),
                )
                .build(),
        )
    };
    let value = Value::Container(vec![Value::Seq(vec![Value::Bytes(vec![7u8; 32]); 3])]);

    let a = DynSsz::new([("ROOT_LIMIT".to_string(), 16u64)]);
    let b = DynSsz::new([
        ("ROOT_LIMIT".to_string(), 16u64),
        ("UNRELATED_NAME".to_string(), 999),
    ]);
    assert_eq!(
        a.marshal(&ty(), &value).unwrap(),
        b.marshal(&ty(), &value).unwrap()
    );
    assert_eq!(
        a.hash_tree_root(&ty(), &value).unwrap(),
        b.hash_tree_root(&ty(), &value).unwrap()
    );

    // Compilation is deterministic for one spec: repeated codecs agree.
    let c = DynSsz::new([("ROOT_LIMIT".to_string(), 16u64)]);
    assert_eq!(
        a.marshal(&ty(), &value).unwrap(),
        c.marshal(&ty(), &value).unwrap()
    );
}

#[test]
fn vector_of_dynamic_elements_uses_offsets() {
    let codec = DynSsz::new([]);
    let ty = TypeExpr::array(TypeExpr::byte_seq(), 3);
    let value = Value::Seq(vec![
        Value::Bytes(vec![1]),
        Value::Bytes(vec![]),
        Value::Bytes(vec![2, 3]),
    ]);
    let bytes = codec.marshal(&ty, &value).unwrap();
    // Three offsets, then the concatenated tails.
    assert_eq!(bytes.len(), 12 + 3);
    assert_eq!(&bytes[..4], &12u32.to_le_bytes());
    assert_eq!(codec.unmarshal(&ty, &bytes).unwrap(), value);
}

#[test]
fn strict_booleans() {
    let codec = DynSsz::new([]);
    assert!(matches!(
        codec.unmarshal(&TypeExpr::Bool, &[2]),
        Err(SszError::InvalidBoolean(2))
    ));
    assert_eq!(
        codec.unmarshal(&TypeExpr::Bool, &[1]).unwrap(),
        Value::Bool(true)
    );
}
