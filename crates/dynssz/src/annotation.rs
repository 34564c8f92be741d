//! Field annotations and their grammar.
//!
//! Annotations are name=value pairs attached to container fields:
//!
//! - `ssz-size="a[,b…]"` — fixed dimensions; `?` inherits from the host type.
//! - `ssz-max="a[,b…]"` — list capacities per dimension.
//! - `ssz-type="kind[,kind…]"` — kind override per dimension; `?` inherits.
//! - `ssz-index="n"` — field index for progressive containers.
//! - `dynssz-size="expr[,expr…]"`, `dynssz-max="expr[,expr…]"` — expressions
//!   over spec names; the static annotation is the fallback when an
//!   expression resolves to nothing.

use crate::error::AnnotationError;
use crate::expr::SizeExpr;

/// Raw annotation strings attached to one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    /// `ssz-size` text.
    pub size: Option<String>,
    /// `ssz-max` text.
    pub max: Option<String>,
    /// `ssz-type` text.
    pub kind: Option<String>,
    /// `ssz-index` text.
    pub index: Option<String>,
    /// `dynssz-size` text.
    pub dyn_size: Option<String>,
    /// `dynssz-max` text.
    pub dyn_max: Option<String>,
}

impl Annotations {
    /// No annotations.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets `ssz-size`.
    pub fn size(mut self, text: &str) -> Self {
        self.size = Some(text.to_string());
        self
    }

    /// Sets `ssz-max`.
    pub fn max(mut self, text: &str) -> Self {
        self.max = Some(text.to_string());
        self
    }

    /// Sets `ssz-type`.
    pub fn kind(mut self, text: &str) -> Self {
        self.kind = Some(text.to_string());
        self
    }

    /// Sets `ssz-index`.
    pub fn index(mut self, text: &str) -> Self {
        self.index = Some(text.to_string());
        self
    }

    /// Sets `dynssz-size`.
    pub fn dyn_size(mut self, text: &str) -> Self {
        self.dyn_size = Some(text.to_string());
        self
    }

    /// Sets `dynssz-max`.
    pub fn dyn_max(mut self, text: &str) -> Self {
        self.dyn_max = Some(text.to_string());
        self
    }

    /// Sets one annotation by its grammar name.
    pub fn set(mut self, name: &str, text: &str) -> Result<Self, AnnotationError> {
        match name {
            "ssz-size" => self.size = Some(text.to_string()),
            "ssz-max" => self.max = Some(text.to_string()),
            "ssz-type" => self.kind = Some(text.to_string()),
            "ssz-index" => self.index = Some(text.to_string()),
            "dynssz-size" => self.dyn_size = Some(text.to_string()),
            "dynssz-max" => self.dyn_max = Some(text.to_string()),
            other => return Err(AnnotationError::UnknownTypeHint(other.to_string())),
        }
        Ok(self)
    }

    /// Parses the raw strings into per-dimension form.
    pub(crate) fn parse(&self) -> Result<ParsedAnnotations, AnnotationError> {
        Ok(ParsedAnnotations {
            sizes: parse_dims(self.size.as_deref(), "ssz-size")?,
            maxes: parse_dims(self.max.as_deref(), "ssz-max")?,
            kinds: parse_kinds(self.kind.as_deref())?,
            index: parse_index(self.index.as_deref())?,
            dyn_sizes: parse_exprs(self.dyn_size.as_deref())?,
            dyn_maxes: parse_exprs(self.dyn_max.as_deref())?,
        })
    }
}

/// One dimension of `ssz-size`/`ssz-max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dim {
    /// `?` — take the dimension from the host type.
    Inherit,
    /// A literal dimension.
    Value(u64),
}

/// Kind override names accepted by `ssz-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KindHint {
    Uint128,
    Uint256,
    Bitvector,
    Bitlist,
    ProgressiveContainer,
    ProgressiveList,
    ProgressiveBitlist,
    Wrapper,
}

/// Structured annotations, sliced one dimension per nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedAnnotations {
    pub(crate) sizes: Vec<Dim>,
    pub(crate) maxes: Vec<Dim>,
    pub(crate) kinds: Vec<Option<KindHint>>,
    pub(crate) index: Option<u64>,
    pub(crate) dyn_sizes: Vec<Option<SizeExpr>>,
    pub(crate) dyn_maxes: Vec<Option<SizeExpr>>,
}

impl ParsedAnnotations {
    /// The outermost dimension of each annotation.
    pub(crate) fn head_size(&self) -> Option<Dim> {
        self.sizes.first().copied()
    }

    pub(crate) fn head_max(&self) -> Option<Dim> {
        self.maxes.first().copied()
    }

    pub(crate) fn head_kind(&self) -> Option<KindHint> {
        self.kinds.first().copied().flatten()
    }

    pub(crate) fn head_dyn_size(&self) -> Option<&SizeExpr> {
        self.dyn_sizes.first().and_then(|expr| expr.as_ref())
    }

    pub(crate) fn head_dyn_max(&self) -> Option<&SizeExpr> {
        self.dyn_maxes.first().and_then(|expr| expr.as_ref())
    }

    /// Annotations for the element level: the outer dimension is consumed.
    pub(crate) fn tail(&self) -> ParsedAnnotations {
        fn rest<T: Clone>(v: &[T]) -> Vec<T> {
            v.iter().skip(1).cloned().collect()
        }
        ParsedAnnotations {
            sizes: rest(&self.sizes),
            maxes: rest(&self.maxes),
            kinds: rest(&self.kinds),
            index: None,
            dyn_sizes: rest(&self.dyn_sizes),
            dyn_maxes: rest(&self.dyn_maxes),
        }
    }
}

fn parse_dims(text: Option<&str>, annotation: &'static str) -> Result<Vec<Dim>, AnnotationError> {
    let Some(text) = text else {
        return Ok(Vec::new());
    };
    text.split(',')
        .map(|dim| {
            let dim = dim.trim();
            if dim == "?" {
                Ok(Dim::Inherit)
            } else {
                dim.parse::<u64>()
                    .map(Dim::Value)
                    .map_err(|_| AnnotationError::InvalidDimension {
                        value: dim.to_string(),
                        annotation,
                    })
            }
        })
        .collect()
}

fn parse_kinds(text: Option<&str>) -> Result<Vec<Option<KindHint>>, AnnotationError> {
    let Some(text) = text else {
        return Ok(Vec::new());
    };
    text.split(',')
        .map(|kind| match kind.trim() {
            "?" => Ok(None),
            "uint128" => Ok(Some(KindHint::Uint128)),
            "uint256" => Ok(Some(KindHint::Uint256)),
            "bitvector" => Ok(Some(KindHint::Bitvector)),
            "bitlist" => Ok(Some(KindHint::Bitlist)),
            "progressive-container" => Ok(Some(KindHint::ProgressiveContainer)),
            "progressive-list" => Ok(Some(KindHint::ProgressiveList)),
            "progressive-bitlist" => Ok(Some(KindHint::ProgressiveBitlist)),
            "wrapper" => Ok(Some(KindHint::Wrapper)),
            other => Err(AnnotationError::UnknownTypeHint(other.to_string())),
        })
        .collect()
}

fn parse_index(text: Option<&str>) -> Result<Option<u64>, AnnotationError> {
    match text {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AnnotationError::InvalidFieldIndex(text.to_string())),
    }
}

fn parse_exprs(text: Option<&str>) -> Result<Vec<Option<SizeExpr>>, AnnotationError> {
    let Some(text) = text else {
        return Ok(Vec::new());
    };
    text.split(',')
        .map(|expr| {
            let expr = expr.trim();
            if expr == "?" || expr.is_empty() {
                Ok(None)
            } else {
                SizeExpr::parse(expr).map(Some).map_err(AnnotationError::from)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_parse() {
        let parsed = Annotations::none().size("32,?").max("1024").parse().unwrap();
        assert_eq!(parsed.sizes, vec![Dim::Value(32), Dim::Inherit]);
        assert_eq!(parsed.maxes, vec![Dim::Value(1024)]);
        assert_eq!(parsed.tail().sizes, vec![Dim::Inherit]);
    }

    #[test]
    fn kind_hints_parse() {
        let parsed = Annotations::none().kind("?,uint256").parse().unwrap();
        assert_eq!(parsed.head_kind(), None);
        assert_eq!(parsed.tail().head_kind(), Some(KindHint::Uint256));
    }

    #[test]
    fn expressions_parse_per_dimension() {
        let parsed = Annotations::none()
            .dyn_size("SLOTS*32,?")
            .parse()
            .unwrap();
        assert!(parsed.head_dyn_size().is_some());
        assert!(parsed.tail().head_dyn_size().is_none());
    }

    #[test]
    fn bad_inputs_are_compile_errors() {
        assert!(Annotations::none().size("abc").parse().is_err());
        assert!(Annotations::none().kind("structy").parse().is_err());
        assert!(Annotations::none().index("-4").parse().is_err());
        assert!(Annotations::none().dyn_size("1 +").parse().is_err());
        assert!(Annotations::none().set("ssz-shape", "3").is_err());
    }
}
