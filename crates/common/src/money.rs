//! Fixed-point money.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of money held as a whole number of cents.
///
/// Prices, subtotals and balances all use this type. On the wire it is a
/// bare integer (`3000` is 30.00).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// `Money::from_units(10)` is 10.00.
    pub const fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    pub const fn zero() -> Self {
        Self::from_cents(0)
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Price of `quantity` units at this unit price, or `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds `other`, or `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Subtracts `other`, or `None` when that would leave less than zero.
    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        self.cents
            .checked_sub(other.cents)
            .filter(|cents| *cents >= 0)
            .map(Money::from_cents)
    }

    /// Sums `amounts`, or `None` if the total overflows.
    pub fn checked_sum<I>(amounts: I) -> Option<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |total, amount| total.checked_add(amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_are_hundreds_of_cents() {
        assert_eq!(Money::from_units(50), Money::from_cents(5000));
        assert_eq!(Money::from_units(0), Money::zero());
    }

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(100).to_string(), "1.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn line_subtotal() {
        let unit_price = Money::from_cents(250);
        assert_eq!(unit_price.checked_mul(4), Some(Money::from_units(10)));
        assert_eq!(unit_price.checked_mul(0), Some(Money::zero()));
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_mul(3), None);
    }

    #[test]
    fn checked_add_stops_at_overflow() {
        let balance = Money::from_units(50);
        assert_eq!(
            balance.checked_add(Money::from_cents(50)),
            Some(Money::from_cents(5050))
        );
        assert_eq!(balance.checked_add(Money::from_cents(i64::MAX)), None);
    }

    #[test]
    fn checked_sub_refuses_to_go_negative() {
        let balance = Money::from_units(20);
        assert_eq!(
            balance.checked_sub(Money::from_units(5)),
            Some(Money::from_units(15))
        );
        assert_eq!(balance.checked_sub(balance), Some(Money::zero()));
        assert_eq!(balance.checked_sub(Money::from_units(30)), None);
    }

    #[test]
    fn cart_total_is_a_checked_sum() {
        let total = Money::checked_sum([1000, 250, 5].into_iter().map(Money::from_cents));
        assert_eq!(total, Some(Money::from_cents(1255)));

        assert_eq!(Money::checked_sum([]), Some(Money::zero()));

        let huge = [Money::from_cents(i64::MAX), Money::from_cents(1)];
        assert_eq!(Money::checked_sum(huge), None);
    }

    #[test]
    fn serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(3000)).unwrap();
        assert_eq!(json, "3000");
        let back: Money = serde_json::from_str("3000").unwrap();
        assert_eq!(back, Money::from_cents(3000));
    }
}
