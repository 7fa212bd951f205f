//! Exact non-negative counts up to and including 2^128.
//!
//! Widths of IPv6 prefixes reach 2^128 for a `/0` root, one past what a `u128`
//! can hold. `Count` keeps a `u128` plus a carry bit so that every capacity
//! figure stays exact without an arbitrary-precision dependency.

use std::fmt;

use serde::{Serialize, Serializer};

/// Decimal text of 2^128.
const TWO_POW_128: &str = "340282366920938463463374607431768211456";

/// A count in the closed range `[0, 2^128]`.
///
/// Field order matters: the derived ordering compares the carry bit first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Count {
    carry: bool,
    low: u128,
}

impl Count {
    pub const ZERO: Count = Count { carry: false, low: 0 };
    pub const ONE: Count = Count { carry: false, low: 1 };
    /// 2^128, the largest representable count.
    pub const MAX: Count = Count { carry: true, low: 0 };

    pub const fn new(value: u128) -> Self {
        Count { carry: false, low: value }
    }

    /// `2^exp`; `None` when `exp > 128`.
    pub fn pow2(exp: u32) -> Option<Self> {
        match exp {
            128 => Some(Count::MAX),
            0..=127 => Some(Count::new(1u128 << exp)),
            _ => None,
        }
    }

    /// Returns the value as a `u128` when it fits.
    pub fn to_u128(self) -> Option<u128> {
        if self.carry {
            None
        } else {
            Some(self.low)
        }
    }

    pub fn is_zero(self) -> bool {
        !self.carry && self.low == 0
    }

    pub fn checked_add(self, rhs: Count) -> Option<Count> {
        let (low, overflowed) = self.low.overflowing_add(rhs.low);
        let carries = u8::from(self.carry) + u8::from(rhs.carry) + u8::from(overflowed);
        match carries {
            0 => Some(Count { carry: false, low }),
            1 if low == 0 => Some(Count::MAX),
            _ => None,
        }
    }

    pub fn checked_sub(self, rhs: Count) -> Option<Count> {
        if self < rhs {
            return None;
        }
        let (low, borrowed) = self.low.overflowing_sub(rhs.low);
        // self >= rhs, so the carry bits absorb any borrow.
        let carry = self.carry && !rhs.carry && !borrowed;
        Some(Count { carry, low })
    }

    pub fn saturating_sub(self, rhs: Count) -> Count {
        self.checked_sub(rhs).unwrap_or(Count::ZERO)
    }

    /// Lossy conversion used only for human-readable utilisation percentages.
    pub fn as_f64(self) -> f64 {
        let high = if self.carry { 2f64.powi(128) } else { 0.0 };
        high + self.low as f64
    }

    /// Share of `total` this count represents, in percent.
    pub fn percent_of(self, total: Count) -> f64 {
        if total.is_zero() {
            return 100.0;
        }
        self.as_f64() / total.as_f64() * 100.0
    }
}

impl From<u128> for Count {
    fn from(value: u128) -> Self {
        Count::new(value)
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count::new(u128::from(value))
    }
}

impl From<u32> for Count {
    fn from(value: u32) -> Self {
        Count::new(u128::from(value))
    }
}

impl From<usize> for Count {
    fn from(value: usize) -> Self {
        // usize is at most 64 bits on every supported target
        Count::new(value as u128)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.carry {
            f.write_str(TWO_POW_128)
        } else {
            write!(f, "{}", self.low)
        }
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Sums counts, returning `None` if the total would exceed 2^128.
pub fn checked_sum<I: IntoIterator<Item = Count>>(counts: I) -> Option<Count> {
    counts
        .into_iter()
        .try_fold(Count::ZERO, |total, count| total.checked_add(count))
}
