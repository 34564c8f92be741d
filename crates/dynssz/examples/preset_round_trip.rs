//! Encode the same type under two network presets.
//!
//! Run with `cargo run --example preset_round_trip`.

use dynssz::{Annotations, DynSsz, TypeDef, TypeExpr, Value};

fn historical_batch() -> TypeExpr {
    TypeExpr::Named(
        TypeDef::container("HistoricalBatch")
            .field(
                "block_roots",
                TypeExpr::array(TypeExpr::bytes(32), 8192),
                Annotations::none().dyn_size("SLOTS_PER_HISTORICAL_ROOT,?"),
            )
            .field(
                "state_roots",
                TypeExpr::array(TypeExpr::bytes(32), 8192),
                Annotations::none().dyn_size("SLOTS_PER_HISTORICAL_ROOT,?"),
            )
            .build(),
    )
}

fn batch_value(slots: usize) -> Value {
    let roots = Value::Seq(vec![Value::Bytes(vec![0x42; 32]); slots]);
    Value::Container(vec![roots.clone(), roots])
}

fn main() {
    let ty = historical_batch();

    for (preset, slots) in [("mainnet", 8192u64), ("minimal", 64)] {
        let codec = DynSsz::new([("SLOTS_PER_HISTORICAL_ROOT".to_string(), slots)]);
        let value = batch_value(slots as usize);
        let bytes = codec.marshal(&ty, &value).expect("marshal");
        let root = codec.hash_tree_root(&ty, &value).expect("hash");
        let decoded = codec.unmarshal(&ty, &bytes).expect("unmarshal");
        assert_eq!(decoded, value);
        println!("{preset}: {} bytes, root {root}", bytes.len());
    }
}
