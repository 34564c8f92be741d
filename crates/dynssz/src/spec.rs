//! Named specification values and their fingerprint.
//!
//! A [`SpecResolver`] is an immutable map from preset names (e.g.
//! `SLOTS_PER_HISTORICAL_ROOT`) to integers. Descriptors are compiled per
//! (type, fingerprint) pair, so two resolvers with the same contents share
//! cached descriptors.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::error::SszError;
use crate::expr::SizeExpr;

/// A value accepted into the spec map.
///
/// Booleans coerce to 0/1; everything else must already be an unsigned
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecValue {
    /// An unsigned integer.
    Uint(u64),
    /// A boolean, coerced to 0 or 1.
    Bool(bool),
}

impl SpecValue {
    fn as_u64(self) -> u64 {
        match self {
            SpecValue::Uint(value) => value,
            SpecValue::Bool(flag) => flag as u64,
        }
    }
}

impl From<u64> for SpecValue {
    fn from(value: u64) -> Self {
        SpecValue::Uint(value)
    }
}

impl From<bool> for SpecValue {
    fn from(value: bool) -> Self {
        SpecValue::Bool(value)
    }
}

/// Immutable spec-name resolver with a stable fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SpecResolver {
    values: BTreeMap<String, u64>,
}

impl SpecResolver {
    /// Builds a resolver from name/value pairs.
    pub fn new(values: impl IntoIterator<Item = (String, u64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Builds a resolver from mixed integer/boolean values.
    pub fn from_values(values: impl IntoIterator<Item = (String, SpecValue)>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(name, value)| (name, value.as_u64()))
                .collect(),
        }
    }

    /// A resolver with no spec values; every expression falls back to its
    /// static annotation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Looks up a spec value.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of defined names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the defined (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Stable digest over the sorted (name, value) pairs.
    ///
    /// Used to key the descriptor cache; resolvers differing only in names
    /// no expression uses still fingerprint differently, which costs one
    /// extra compilation but never an incorrect descriptor.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Sha256::new();
        for (name, value) in &self.values {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(value.to_le_bytes());
        }
        let digest = hasher.finalize();
        u64::from_le_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
    }

    /// Parses `text` and resolves it against this resolver.
    ///
    /// `fallback` is the static annotation value; it is used when the
    /// expression mentions no known spec name. Exposed for generated
    /// dynamic-spec routines.
    pub fn resolve_expr(&self, text: &str, fallback: Option<u64>) -> Result<u64, SszError> {
        let expr = SizeExpr::parse(text)?;
        match expr.eval(self)? {
            Some(value) => Ok(value),
            None => fallback.ok_or_else(|| {
                SszError::UnresolvedSpec(
                    expr.names()
                        .first()
                        .map(|name| (*name).to_string())
                        .unwrap_or_else(|| text.to_string()),
                )
            }),
        }
    }

    /// Loads a resolver from a JSON object of numbers and booleans.
    ///
    /// Network presets ship as JSON/YAML maps; unknown value shapes are
    /// rejected.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, SszError> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|err| SszError::UnsupportedKind(format!("spec json: {err}")))?;
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let value = match value {
                serde_json::Value::Bool(flag) => flag as u64,
                serde_json::Value::Number(number) => number
                    .as_u64()
                    .ok_or_else(|| SszError::UnsupportedKind(format!("spec value {name}")))?,
                serde_json::Value::String(text) => text
                    .parse::<u64>()
                    .map_err(|_| SszError::UnsupportedKind(format!("spec value {name}")))?,
                _ => return Err(SszError::UnsupportedKind(format!("spec value {name}"))),
            };
            values.insert(name, value);
        }
        Ok(Self { values })
    }
}

impl FromIterator<(String, u64)> for SpecResolver {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(pairs: &[(&str, u64)]) -> SpecResolver {
        SpecResolver::new(pairs.iter().map(|(k, v)| (k.to_string(), *v)))
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = resolver(&[("A", 1), ("B", 2)]);
        let b = SpecResolver::new([("B".to_string(), 2), ("A".to_string(), 1)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_values() {
        assert_ne!(
            resolver(&[("A", 1)]).fingerprint(),
            resolver(&[("A", 2)]).fingerprint()
        );
        assert_ne!(
            resolver(&[("A", 1)]).fingerprint(),
            resolver(&[("B", 1)]).fingerprint()
        );
    }

    #[test]
    fn bool_values_coerce() {
        let spec = SpecResolver::from_values([
            ("FLAG".to_string(), SpecValue::Bool(true)),
            ("N".to_string(), SpecValue::Uint(9)),
        ]);
        assert_eq!(spec.get("FLAG"), Some(1));
        assert_eq!(spec.get("N"), Some(9));
    }

    #[test]
    fn resolve_expr_with_fallback() {
        let spec = resolver(&[("SLOTS", 64)]);
        assert_eq!(spec.resolve_expr("SLOTS*2", Some(10)).unwrap(), 128);
        assert_eq!(spec.resolve_expr("MISSING", Some(10)).unwrap(), 10);
        assert!(spec.resolve_expr("MISSING", None).is_err());
    }
}
