//! Fixed-width concrete bit-vectors.
//!
//! [`BvConst`] is a nonnegative integer normalised into `[0, 2^W)` for a
//! width `W >= 1`, reinterpretable as signed through the top bit. Every
//! operation masks its result, so the normalisation invariant always holds.
//! Widths are arbitrary: 3-bit and 96-bit values work the same way as
//! 32-bit ones.

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

use crate::error::{ExprError, Result};

/// Bit-vector width in bits.
pub type BvWidth = u32;

fn mask(width: BvWidth) -> BigUint {
    (BigUint::one() << width) - BigUint::one()
}

fn modulus(width: BvWidth) -> BigUint {
    BigUint::one() << width
}

/// A concrete bit-vector of fixed width.
///
/// The value is stored unsigned; [`BvConst::int_value`] and the signed
/// operations reinterpret it in two's complement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BvConst {
    width: BvWidth,
    value: BigUint,
}

impl BvConst {
    /// Builds a constant from a signed integer, reducing it into
    /// `[0, 2^width)` by two's complement.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn new(value: i64, width: BvWidth) -> Self {
        assert!(width >= 1, "bit-vector width must be at least 1");
        if value < 0 {
            let m = BigUint::from(value.unsigned_abs()) % modulus(width);
            let v = if m.is_zero() { m } else { modulus(width) - m };
            Self { width, value: v }
        } else {
            Self {
                width,
                value: BigUint::from(value as u64) & mask(width),
            }
        }
    }

    /// Builds a constant from an unsigned big integer, masked to `width`.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn from_biguint(value: BigUint, width: BvWidth) -> Self {
        assert!(width >= 1, "bit-vector width must be at least 1");
        Self {
            width,
            value: value & mask(width),
        }
    }

    /// Builds a constant from a signed big integer, reduced by two's
    /// complement.
    ///
    /// # Panics
    ///
    /// Panics if `width` is zero.
    #[must_use]
    pub fn from_bigint(value: &BigInt, width: BvWidth) -> Self {
        assert!(width >= 1, "bit-vector width must be at least 1");
        let m = value.magnitude() % modulus(width);
        let v = if value.sign() == num_bigint::Sign::Minus && !m.is_zero() {
            modulus(width) - m
        } else {
            m
        };
        Self { width, value: v }
    }

    /// Parses a constant from a string in the given radix (e.g. hex model
    /// values coming back from a backend).
    #[must_use]
    pub fn from_str_radix(s: &str, radix: u32, width: BvWidth) -> Option<Self> {
        let v = BigUint::parse_bytes(s.as_bytes(), radix)?;
        Some(Self::from_biguint(v, width))
    }

    /// The zero constant of the given width.
    #[must_use]
    pub fn zero(width: BvWidth) -> Self {
        Self::new(0, width)
    }

    /// The one constant of the given width.
    #[must_use]
    pub fn one(width: BvWidth) -> Self {
        Self::new(1, width)
    }

    /// The all-ones constant of the given width (`-1` signed).
    #[must_use]
    pub fn all_ones(width: BvWidth) -> Self {
        assert!(width >= 1, "bit-vector width must be at least 1");
        Self {
            width,
            value: mask(width),
        }
    }

    /// Width in bits.
    #[must_use]
    pub fn width(&self) -> BvWidth {
        self.width
    }

    /// The unsigned value.
    #[must_use]
    pub fn uint_value(&self) -> &BigUint {
        &self.value
    }

    /// The value reinterpreted as a signed integer.
    #[must_use]
    pub fn int_value(&self) -> BigInt {
        if self.is_negative() {
            BigInt::from(self.value.clone()) - BigInt::from(modulus(self.width))
        } else {
            BigInt::from(self.value.clone())
        }
    }

    /// True iff the sign bit (bit `width - 1`) is set.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.value.bit(u64::from(self.width) - 1)
    }

    /// True iff the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// True iff the value is one.
    #[must_use]
    pub fn is_one(&self) -> bool {
        self.value.is_one()
    }

    /// True iff every bit is set.
    #[must_use]
    pub fn has_all_bits_set(&self) -> bool {
        self.value == mask(self.width)
    }

    /// True iff the unsigned value is representable in a `u64`.
    #[must_use]
    pub fn fits_in_u64(&self) -> bool {
        self.value.bits() <= 64
    }

    /// The low 64 bits of the value. Callers that need the exact value
    /// should check [`BvConst::fits_in_u64`] first.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.value.iter_u64_digits().next().unwrap_or(0)
    }

    /// The signed value truncated to an `i64`. Meaningful only when the
    /// signed magnitude fits in 64 bits.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        if self.is_negative() {
            -(self.neg().as_u64() as i64)
        } else {
            self.as_u64() as i64
        }
    }

    fn check_width(&self, other: &Self) -> Result<()> {
        if self.width != other.width {
            return Err(ExprError::WidthMismatch {
                lhs: self.width,
                rhs: other.width,
            });
        }
        Ok(())
    }

    /// Modular addition.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: (&self.value + &other.value) & mask(self.width),
        })
    }

    /// Modular subtraction.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: (&self.value + modulus(self.width) - &other.value) & mask(self.width),
        })
    }

    /// Modular multiplication.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: (&self.value * &other.value) & mask(self.width),
        })
    }

    /// Unsigned division. Division by zero yields all-ones, following the
    /// SMT bit-vector semantics.
    pub fn udiv(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        if other.is_zero() {
            return Ok(Self::all_ones(self.width));
        }
        Ok(Self {
            width: self.width,
            value: &self.value / &other.value,
        })
    }

    /// Unsigned remainder. Remainder by zero yields the dividend.
    pub fn urem(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        if other.is_zero() {
            return Ok(self.clone());
        }
        Ok(Self {
            width: self.width,
            value: &self.value % &other.value,
        })
    }

    /// Signed division, truncating toward zero. Division by zero yields
    /// all-ones (`-1`).
    pub fn sdiv(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        if other.is_zero() {
            return Ok(Self::all_ones(self.width));
        }
        let q = self.int_value() / other.int_value();
        Ok(Self::from_bigint(&q, self.width))
    }

    /// Signed remainder with the sign of the dividend. Remainder by zero
    /// yields the dividend.
    pub fn srem(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        if other.is_zero() {
            return Ok(self.clone());
        }
        let r = self.int_value() % other.int_value();
        Ok(Self::from_bigint(&r, self.width))
    }

    /// Bitwise and.
    pub fn and(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: &self.value & &other.value,
        })
    }

    /// Bitwise or.
    pub fn or(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: &self.value | &other.value,
        })
    }

    /// Bitwise xor.
    pub fn xor(&self, other: &Self) -> Result<Self> {
        self.check_width(other)?;
        Ok(Self {
            width: self.width,
            value: &self.value ^ &other.value,
        })
    }

    /// Bitwise complement.
    #[must_use]
    pub fn not(&self) -> Self {
        Self {
            width: self.width,
            value: mask(self.width) - &self.value,
        }
    }

    /// Two's-complement negation.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self {
            width: self.width,
            value: (modulus(self.width) - &self.value) & mask(self.width),
        }
    }

    /// Left shift. Shifting by `n >= width` gives zero.
    #[must_use]
    pub fn shl(&self, n: BvWidth) -> Self {
        if n >= self.width {
            return Self::zero(self.width);
        }
        Self {
            width: self.width,
            value: (&self.value << n) & mask(self.width),
        }
    }

    /// Logical right shift. Shifting by `n >= width` gives zero.
    #[must_use]
    pub fn lshr(&self, n: BvWidth) -> Self {
        if n >= self.width {
            return Self::zero(self.width);
        }
        Self {
            width: self.width,
            value: &self.value >> n,
        }
    }

    /// Arithmetic right shift. Shifting by `n >= width` saturates to
    /// all-ones for negative values and zero otherwise.
    #[must_use]
    pub fn ashr(&self, n: BvWidth) -> Self {
        if n >= self.width {
            return if self.is_negative() {
                Self::all_ones(self.width)
            } else {
                Self::zero(self.width)
            };
        }
        if n == 0 {
            return self.clone();
        }
        let mut value = &self.value >> n;
        if self.is_negative() {
            value |= mask(n) << (self.width - n);
        }
        Self {
            width: self.width,
            value,
        }
    }

    /// Concatenation with `self` as the high part. The result width is the
    /// sum of both widths.
    #[must_use]
    pub fn concat(&self, low: &Self) -> Self {
        Self {
            width: self.width + low.width,
            value: (&self.value << low.width) | &low.value,
        }
    }

    /// Shrinks the value in place to bits `[high:low]`.
    pub fn truncate(&mut self, high: BvWidth, low: BvWidth) -> Result<()> {
        if low > high || high >= self.width {
            return Err(ExprError::OutOfBounds {
                high,
                low,
                width: self.width,
            });
        }
        let width = high - low + 1;
        self.value = (&self.value >> low) & mask(width);
        self.width = width;
        Ok(())
    }

    /// Returns bits `[high:low]` as a fresh value of width
    /// `high - low + 1`.
    pub fn slice(&self, high: BvWidth, low: BvWidth) -> Result<Self> {
        let mut res = self.clone();
        res.truncate(high, low)?;
        Ok(res)
    }

    /// Zero extension by `n` bits; the value is unchanged.
    #[must_use]
    pub fn zext(&self, n: BvWidth) -> Self {
        Self {
            width: self.width + n,
            value: self.value.clone(),
        }
    }

    /// Sign extension by `n` bits.
    #[must_use]
    pub fn sext(&self, n: BvWidth) -> Self {
        if !self.is_negative() || n == 0 {
            return self.zext(n);
        }
        Self {
            width: self.width + n,
            value: (mask(n) << self.width) | &self.value,
        }
    }

    /// Equality; errors on width mismatch.
    pub fn eq(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.value == other.value)
    }

    /// Unsigned less-than.
    pub fn ult(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.value < other.value)
    }

    /// Unsigned less-or-equal.
    pub fn ule(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.value <= other.value)
    }

    /// Unsigned greater-than.
    pub fn ugt(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.value > other.value)
    }

    /// Unsigned greater-or-equal.
    pub fn uge(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.value >= other.value)
    }

    /// Signed less-than.
    pub fn slt(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.int_value() < other.int_value())
    }

    /// Signed less-or-equal.
    pub fn sle(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.int_value() <= other.int_value())
    }

    /// Signed greater-than.
    pub fn sgt(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.int_value() > other.int_value())
    }

    /// Signed greater-or-equal.
    pub fn sge(&self, other: &Self) -> Result<bool> {
        self.check_width(other)?;
        Ok(self.int_value() >= other.int_value())
    }
}

impl fmt::Display for BvConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<BV{} 0x{:x}>", self.width, self.value)
    }
}
