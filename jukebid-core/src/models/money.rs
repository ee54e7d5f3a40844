use serde::{Deserialize, Serialize};

/// Monetary amount in minor units (pence).
///
/// Bids, balances and party minimums are all integer pence; aggregate
/// values are sums of bid amounts and are never recomputed by subtraction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Pence(pub i64);

impl Pence {
    pub const ZERO: Self = Self(0);

    /// Build from a whole-pound + pence pair, e.g. `Pence::from_pounds(9, 50)`.
    #[must_use]
    pub const fn from_pounds(pounds: i64, pence: i64) -> Self {
        Self(pounds * 100 + pence)
    }

    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition; aggregates cannot wrap.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl std::ops::Add for Pence {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl std::iter::Sum for Pence {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl std::fmt::Display for Pence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}\u{a3}{}.{:02}", abs / 100, abs % 100)
    }
}
