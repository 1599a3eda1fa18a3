//! Amounts and basis points
//!
//! Amounts are non-negative integers in the smallest currency unit.
//! Ownership is expressed in basis points, where [`BPS_DENOMINATOR`]
//! (10000) is the whole pool.

use serde::{Deserialize, Serialize};

/// Basis points in one whole (100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// A currency amount in the smallest unit
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Amount(pub u64);

impl Amount {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proportional ownership in 1/100ths of a percent
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct BasisPoints(pub u32);

impl BasisPoints {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Floored share of `part` over `whole`; zero when `whole` is zero
    pub fn of(part: Amount, whole: Amount) -> Self {
        if whole.is_zero() {
            return Self(0);
        }
        let bps = (part.0 as u128 * BPS_DENOMINATOR as u128) / whole.0 as u128;
        Self(bps.min(BPS_DENOMINATOR as u128) as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for BasisPoints {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|b| b.0).sum())
    }
}
