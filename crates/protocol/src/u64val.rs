//! Unsigned semantics for 64-bit values transported in a signed 64-bit slot.
//!
//! The scan engine's timestamp and counter columns are unsigned 64-bit, but
//! every layer between it and the host engine moves them through a signed
//! 64-bit slot. The bit pattern is the source of truth; the sign is a
//! transport artifact. Every comparison or arithmetic operation on such a
//! value must go through [`U64`] — comparing the raw slot as a signed
//! integer orders top-bit-set values first, which is exactly wrong.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use varve_common::{Result, VarveError};

/// An unsigned 64-bit value carried in a signed 64-bit transport slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct U64(i64);

impl U64 {
    pub const ZERO: U64 = U64(0);
    /// All bits set; decodes as `-1` under signed interpretation.
    pub const MAX: U64 = U64(-1);

    /// Wraps a transport slot without changing its bits.
    pub const fn from_bits(bits: i64) -> Self {
        U64(bits)
    }

    /// The raw transport slot.
    pub const fn to_bits(self) -> i64 {
        self.0
    }

    /// The unsigned magnitude of the bit pattern.
    pub const fn magnitude(self) -> u64 {
        self.0 as u64
    }

    const fn from_magnitude(value: u64) -> Self {
        U64(value as i64)
    }

    /// Unsigned comparison of two slot values. A pattern with the top bit
    /// set is larger, not negative.
    pub fn cmp_unsigned(self, other: U64) -> Ordering {
        self.magnitude().cmp(&other.magnitude())
    }

    /// Compares against an ordinary signed 64-bit integer with unsigned
    /// semantics throughout: a negative rhs sits below every representable
    /// unsigned value.
    pub fn cmp_signed64(self, rhs: i64) -> Ordering {
        if rhs < 0 {
            return Ordering::Greater;
        }
        self.magnitude().cmp(&(rhs as u64))
    }

    /// Same rule as [`U64::cmp_signed64`] for a signed 32-bit rhs.
    pub fn cmp_signed32(self, rhs: i32) -> Ordering {
        self.cmp_signed64(rhs as i64)
    }

    /// Narrows to a signed 32-bit integer.
    ///
    /// # Errors
    /// [`VarveError::Range`] when the magnitude exceeds `i32::MAX`.
    pub fn to_i32(self) -> Result<i32> {
        i32::try_from(self.magnitude())
            .map_err(|_| VarveError::Range(format!("out of range for integer: {self}")))
    }

    /// Unsigned addition of a signed 32-bit operand.
    ///
    /// # Errors
    /// [`VarveError::Range`] on overflow or underflow; the sum never wraps.
    pub fn checked_add(self, rhs: i32) -> Result<U64> {
        let out = if rhs >= 0 {
            self.magnitude().checked_add(rhs as u64)
        } else {
            self.magnitude().checked_sub(u64::from(rhs.unsigned_abs()))
        };
        out.map(U64::from_magnitude)
            .ok_or_else(|| VarveError::Range(format!("unsigned addition overflow: {self} + {rhs}")))
    }

    /// Unsigned subtraction of a signed 32-bit operand.
    ///
    /// # Errors
    /// [`VarveError::Range`] on overflow or underflow.
    pub fn checked_sub(self, rhs: i32) -> Result<U64> {
        let out = if rhs >= 0 {
            self.magnitude().checked_sub(rhs as u64)
        } else {
            self.magnitude().checked_add(u64::from(rhs.unsigned_abs()))
        };
        out.map(U64::from_magnitude).ok_or_else(|| {
            VarveError::Range(format!("unsigned subtraction overflow: {self} - {rhs}"))
        })
    }

    /// Unsigned multiplication by a signed 32-bit operand.
    ///
    /// # Errors
    /// [`VarveError::Range`] for a negative multiplier (the product would not
    /// be unsigned) and on overflow.
    pub fn checked_mul(self, rhs: i32) -> Result<U64> {
        if rhs < 0 {
            return Err(VarveError::Range(format!(
                "cannot multiply unsigned {self} by negative {rhs}"
            )));
        }
        self.magnitude()
            .checked_mul(rhs as u64)
            .map(U64::from_magnitude)
            .ok_or_else(|| {
                VarveError::Range(format!("unsigned multiplication overflow: {self} * {rhs}"))
            })
    }

    /// Unsigned division by a signed 32-bit operand.
    ///
    /// # Errors
    /// [`VarveError::Range`] for a negative or zero divisor.
    pub fn checked_div(self, rhs: i32) -> Result<U64> {
        if rhs < 0 {
            return Err(VarveError::Range(format!(
                "cannot divide unsigned {self} by negative {rhs}"
            )));
        }
        self.magnitude()
            .checked_div(rhs as u64)
            .map(U64::from_magnitude)
            .ok_or_else(|| VarveError::Range(format!("division of {self} by zero")))
    }

    /// Unsigned remainder; a negative divisor is folded to its absolute value.
    ///
    /// # Errors
    /// [`VarveError::Range`] for a zero divisor.
    pub fn checked_rem(self, rhs: i32) -> Result<U64> {
        self.magnitude()
            .checked_rem(u64::from(rhs.unsigned_abs()))
            .map(U64::from_magnitude)
            .ok_or_else(|| VarveError::Range(format!("modulo of {self} by zero")))
    }

    /// Deterministic FNV-1a hash of the raw 8-byte little-endian pattern.
    ///
    /// Stable across processes and releases, unlike the std hasher.
    pub fn hash64(self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = FNV_OFFSET;
        for byte in self.0.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }
}

impl PartialOrd for U64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_unsigned(*other)
    }
}

impl Hash for U64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.magnitude());
    }
}

impl fmt::Display for U64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.magnitude())
    }
}

impl From<u64> for U64 {
    fn from(value: u64) -> Self {
        U64::from_magnitude(value)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::U64;

    const TOP_BIT: u64 = 0x8000_0000_0000_0000;

    #[test]
    fn top_bit_pattern_is_large_not_negative() {
        let a = U64::from(TOP_BIT);
        let b = U64::from(1u64);
        assert_eq!(a.cmp_unsigned(b), Ordering::Greater);
        assert_eq!(b.cmp_unsigned(a), Ordering::Less);
        assert!(a.to_bits() < 0);
    }

    #[test]
    fn comparison_is_antisymmetric_and_transitive() {
        let values = [
            U64::ZERO,
            U64::from(1u64),
            U64::from(i64::MAX as u64),
            U64::from(TOP_BIT),
            U64::MAX,
        ];
        for a in values {
            for b in values {
                assert_eq!(a.cmp_unsigned(b), b.cmp_unsigned(a).reverse());
                for c in values {
                    if a.cmp_unsigned(b) == Ordering::Less && b.cmp_unsigned(c) == Ordering::Less {
                        assert_eq!(a.cmp_unsigned(c), Ordering::Less);
                    }
                }
            }
        }
    }

    #[test]
    fn signed_rhs_comparisons() {
        let huge = U64::from(TOP_BIT);
        assert_eq!(huge.cmp_signed64(-1), Ordering::Greater);
        assert_eq!(huge.cmp_signed64(i64::MAX), Ordering::Greater);
        assert_eq!(U64::ZERO.cmp_signed64(-1), Ordering::Greater);
        assert_eq!(U64::ZERO.cmp_signed64(0), Ordering::Equal);
        assert_eq!(U64::from(5u64).cmp_signed32(7), Ordering::Less);
        assert_eq!(U64::from(5u64).cmp_signed32(-7), Ordering::Greater);
    }

    #[test]
    fn cast_to_i32_checks_range() {
        assert_eq!(U64::from(42u64).to_i32().unwrap(), 42);
        assert_eq!(U64::from(i32::MAX as u64).to_i32().unwrap(), i32::MAX);
        assert!(U64::from(i32::MAX as u64 + 1).to_i32().is_err());
        assert!(U64::MAX.to_i32().is_err());
    }

    #[test]
    fn addition_overflow_and_underflow() {
        assert_eq!(U64::from(10u64).checked_add(5).unwrap(), U64::from(15u64));
        assert_eq!(U64::from(10u64).checked_add(-5).unwrap(), U64::from(5u64));
        assert!(U64::MAX.checked_add(1).is_err());
        assert!(U64::ZERO.checked_add(-1).is_err());
    }

    #[test]
    fn subtraction_overflow_and_underflow() {
        assert_eq!(U64::from(10u64).checked_sub(5).unwrap(), U64::from(5u64));
        assert_eq!(U64::from(10u64).checked_sub(-5).unwrap(), U64::from(15u64));
        assert!(U64::ZERO.checked_sub(1).is_err());
        assert!(U64::MAX.checked_sub(-1).is_err());
    }

    #[test]
    fn multiplication_rejects_negative_and_overflow() {
        assert_eq!(U64::from(6u64).checked_mul(7).unwrap(), U64::from(42u64));
        assert!(U64::from(2u64).checked_mul(-3).is_err());
        assert!(U64::MAX.checked_mul(2).is_err());
    }

    #[test]
    fn division_and_modulo() {
        assert_eq!(U64::from(42u64).checked_div(7).unwrap(), U64::from(6u64));
        assert!(U64::from(42u64).checked_div(-7).is_err());
        assert!(U64::from(42u64).checked_div(0).is_err());
        assert_eq!(U64::from(42u64).checked_rem(5).unwrap(), U64::from(2u64));
        assert_eq!(U64::from(42u64).checked_rem(-5).unwrap(), U64::from(2u64));
        assert!(U64::from(42u64).checked_rem(0).is_err());
        // Top-bit values divide as magnitudes, not as negative numbers.
        assert_eq!(
            U64::from(TOP_BIT).checked_div(2).unwrap(),
            U64::from(TOP_BIT / 2)
        );
    }

    #[test]
    fn hash_is_deterministic_and_spreads() {
        let a = U64::from(1u64);
        assert_eq!(a.hash64(), a.hash64());
        assert_ne!(U64::from(1u64).hash64(), U64::from(2u64).hash64());
        assert_ne!(U64::ZERO.hash64(), U64::MAX.hash64());
    }

    #[test]
    fn display_renders_magnitude() {
        assert_eq!(U64::MAX.to_string(), u64::MAX.to_string());
        assert_eq!(U64::from(7u64).to_string(), "7");
    }
}
