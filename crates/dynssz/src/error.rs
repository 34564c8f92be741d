//! Error types for the dynamic SSZ codec.

use thiserror::Error;

use dynssz_merkle::MerkleError;

/// Errors produced while compiling descriptors or coding values.
///
/// Any error aborts the current top-level call; partial output in a
/// caller-provided buffer is unspecified but bounded by the reserved
/// capacity.
#[derive(Debug, Error)]
pub enum SszError {
    /// The buffer or stream ended before the required bytes.
    #[error("unexpected end of input: needed {needed} bytes, had {available}")]
    UnexpectedEof {
        /// Bytes required to continue decoding.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// An offset pointed into the fixed portion of its container.
    #[error("offset {0} points into the fixed portion")]
    OffsetIntoFixedPortion(usize),

    /// The offset table was not monotonically increasing.
    #[error("offset {0} is smaller than its predecessor")]
    OffsetsAreDecreasing(usize),

    /// An offset pointed past the end of the enclosing buffer.
    #[error("offset {0} is beyond the end of the buffer")]
    OffsetOutOfBounds(usize),

    /// The first offset of a dynamic-element list was not a multiple of 4.
    #[error("first offset {0} does not describe a whole offset table")]
    InvalidListPrefix(usize),

    /// An encoded or supplied list exceeded its declared limit.
    #[error("list of {len} items exceeds the limit of {limit}")]
    ListTooBig {
        /// Number of items observed.
        len: usize,
        /// Declared limit.
        limit: usize,
    },

    /// A boolean byte outside `{0x00, 0x01}`.
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBoolean(u8),

    /// A union selector outside the declared variant range.
    #[error("union selector {selector} is outside the {variants} declared variants")]
    InvalidUnionVariant {
        /// The selector byte read or supplied.
        selector: u8,
        /// Number of declared variants.
        variants: usize,
    },

    /// A size expression referenced a spec name with no value and no
    /// static fallback.
    #[error("spec name {0:?} is not defined and no static fallback exists")]
    UnresolvedSpec(String),

    /// A field annotation failed to parse or contradicted the host type.
    #[error("bad annotation: {0}")]
    BadAnnotation(#[from] AnnotationError),

    /// A host type the engine cannot encode.
    #[error("unsupported type kind: {0}")]
    UnsupportedKind(String),

    /// A recursive host type definition.
    #[error("recursive type definition through {0:?}")]
    RecursiveType(String),

    /// A buffer whose length cannot match the descriptor.
    #[error("invalid byte length: given {len}, expected {expected}")]
    InvalidByteLength {
        /// Given length.
        len: usize,
        /// Expected length.
        expected: usize,
    },

    /// A value whose element count cannot match the descriptor.
    #[error("invalid length: given {len}, expected {expected}")]
    LengthMismatch {
        /// Given element count.
        len: usize,
        /// Expected element count.
        expected: usize,
    },

    /// A bitfield with bits set beyond its length.
    #[error("bitfield has excess bits set beyond its length")]
    ExcessBits,

    /// A bitlist without a sentinel bit.
    #[error("bitlist has no sentinel bit, its length is unknowable")]
    MissingLengthInformation,

    /// A value that does not match the descriptor's kind.
    #[error("value kind mismatch: descriptor expects {expected}, value is {found}")]
    TypeMismatch {
        /// What the descriptor needs.
        expected: &'static str,
        /// What the value holds.
        found: &'static str,
    },

    /// Merkleization failure.
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// The output sink failed; the underlying error is passed through.
    #[error("sink failure: {0}")]
    Sink(#[source] std::io::Error),

    /// The input source failed; the underlying error is passed through.
    #[error("source failure: {0}")]
    Source(#[source] std::io::Error),
}

/// Annotation and size-expression parse errors, raised at descriptor
/// compile time before any byte is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// A dimension that is neither a number nor `?`.
    #[error("invalid dimension {value:?} in {annotation}")]
    InvalidDimension {
        /// The offending dimension text.
        value: String,
        /// The annotation it appeared in.
        annotation: &'static str,
    },

    /// An `ssz-type` name the compiler does not know.
    #[error("unknown type hint {0:?}")]
    UnknownTypeHint(String),

    /// An `ssz-index` that is not a number.
    #[error("invalid field index {0:?}")]
    InvalidFieldIndex(String),

    /// `?` used where the host type has no dimension to inherit.
    #[error("dimension `?` cannot be inherited for field {0:?}")]
    NothingToInherit(String),

    /// Progressive-container field indices must be strictly increasing.
    #[error("field index {index} for {field:?} is not strictly increasing")]
    NonIncreasingFieldIndex {
        /// The offending field.
        field: String,
        /// Its declared index.
        index: u64,
    },

    /// Progressive-container field index beyond the active-fields chunk.
    #[error("field index {0} exceeds the active-fields capacity of 255")]
    FieldIndexTooLarge(u64),

    /// A size expression that failed to parse or evaluate.
    #[error("size expression error: {0}")]
    Expr(#[from] ExprError),

    /// A hint that contradicts the host type it annotates.
    #[error("annotation {annotation} does not apply to {host}")]
    HintMismatch {
        /// The annotation name.
        annotation: &'static str,
        /// Description of the host type.
        host: String,
    },
}

/// Errors from the small arithmetic language of `dynssz-size`/`dynssz-max`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// A character the tokenizer does not recognize.
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    /// A token out of place.
    #[error("unexpected token {0:?}")]
    UnexpectedToken(String),

    /// Input ended in the middle of an expression.
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// A numeric literal that does not fit in 64 bits.
    #[error("numeric literal {0:?} overflows")]
    LiteralOverflow(String),

    /// Overflow or division by zero during evaluation.
    #[error("arithmetic failure evaluating {0:?}")]
    Arithmetic(String),
}
