//! Primitive types shared by the dynamic SSZ crates.
//!
//! Wide unsigned integers are backed by [`ruint`]; fixed-length byte arrays
//! are a thin wrapper over `[u8; N]` so the codec can hand out roots and
//! uint256 payloads without dragging in an Ethereum primitives crate.

use std::fmt;
use std::str::FromStr;

use ruint::Uint;

/// A 128-bit unsigned integer.
pub type U128 = Uint<128, 2>;

/// A 256-bit unsigned integer.
pub type U256 = Uint<256, 4>;

/// A fixed-length byte array.
///
/// The byte order is whatever the producer wrote; the codec treats these as
/// opaque little-endian payloads for `uint128`/`uint256` and as raw digests
/// for hash outputs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedBytes<const N: usize>(pub [u8; N]);

impl<const N: usize> FixedBytes<N> {
    /// All zero bytes.
    pub const ZERO: Self = Self([0u8; N]);

    /// Creates an array filled with zeros.
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Creates an array with every byte set to `byte`.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; N])
    }

    /// Copies `slice` into a zeroed array, left-aligned.
    ///
    /// Bytes beyond `N` are ignored; a short slice leaves the tail zeroed.
    pub fn right_padding_from(slice: &[u8]) -> Self {
        let mut out = [0u8; N];
        let len = slice.len().min(N);
        out[..len].copy_from_slice(&slice[..len]);
        Self(out)
    }

    /// Copies a slice of exactly `N` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `slice.len() != N`.
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Self(out)
    }

    /// Returns the bytes as a slice.
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the inner array.
    pub const fn into_inner(self) -> [u8; N] {
        self.0
    }

    /// Parses from a hex string, with or without a `0x` prefix.
    pub fn from_hex_str(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != N {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self::from_slice(&bytes))
    }

    /// Lower-hex rendering without a prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl<const N: usize> Default for FixedBytes<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> From<[u8; N]> for FixedBytes<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> AsRef<[u8]> for FixedBytes<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> AsMut<[u8]> for FixedBytes<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const N: usize> fmt::Debug for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<const N: usize> fmt::Display for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<const N: usize> FromStr for FixedBytes<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_str(s)
    }
}

/// A 256-bit digest (32 bytes).
pub type Hash256 = FixedBytes<32>;

impl From<U256> for Hash256 {
    fn from(value: U256) -> Self {
        Self(value.to_le_bytes::<32>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let h: Hash256 = "0x5ac78d953211aa822c3ae6e9b0058e42394dd32e5992f29f9c12da3681985130"
            .parse()
            .unwrap();
        assert_eq!(
            format!("{h}"),
            "0x5ac78d953211aa822c3ae6e9b0058e42394dd32e5992f29f9c12da3681985130"
        );
    }

    #[test]
    fn hex_rejects_wrong_length() {
        assert!(Hash256::from_hex_str("0xabcd").is_err());
    }

    #[test]
    fn right_padding() {
        let b = FixedBytes::<4>::right_padding_from(&[1, 2]);
        assert_eq!(b.as_slice(), &[1, 2, 0, 0]);
    }

    #[test]
    fn u256_to_hash_is_little_endian() {
        let h: Hash256 = U256::from(1u64).into();
        assert_eq!(h.as_slice()[0], 1);
        assert!(h.as_slice()[1..].iter().all(|b| *b == 0));
    }
}
