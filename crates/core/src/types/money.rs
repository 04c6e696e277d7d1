//! Monetary amounts in the store's single currency.
//!
//! Prices are entered with two decimal places and all arithmetic is done
//! in [`Decimal`] so totals never drift the way `f64` sums do. Amounts are
//! bounded by what a `NUMERIC(12, 2)` column holds, and arithmetic is
//! checked against that bound.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Amounts are never negative.
    #[error("amount cannot be negative")]
    Negative,
    /// Amounts above [`Money::MAX_CENTS`] do not fit the database columns.
    #[error("amount cannot exceed 9999999999.99")]
    TooLarge,
}

/// A non-negative amount rounded to cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount in cents (`9999999999.99`).
    pub const MAX_CENTS: i64 = 999_999_999_999;

    /// Create an amount, rounding half away from zero to two places.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` for amounts below zero and
    /// `MoneyError::TooLarge` for amounts above [`Self::MAX_CENTS`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let amount = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if amount > Decimal::new(Self::MAX_CENTS, 2) {
            return Err(MoneyError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// This amount multiplied by a quantity, or `None` past the maximum.
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .and_then(|amount| Self::new(amount).ok())
    }

    /// Sum of two amounts, or `None` past the maximum.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .and_then(|amount| Self::new(amount).ok())
    }

    /// Sum of many amounts, or `None` once the running total passes the maximum.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }

    /// Lossy conversion for spreadsheet cells.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Money::new(Decimal::new(-1, 2)), Err(MoneyError::Negative));
    }

    #[test]
    fn test_rounds_to_cents() {
        let m = Money::new(Decimal::new(19_995, 3)).unwrap();
        assert_eq!(m.amount(), Decimal::new(2000, 2));
    }

    #[test]
    fn test_rejects_amounts_past_column_limit() {
        assert!(Money::new(Decimal::new(Money::MAX_CENTS, 2)).is_ok());
        assert_eq!(
            Money::new(Decimal::new(100_000_000_000, 0)),
            Err(MoneyError::TooLarge)
        );
        assert!(serde_json::from_str::<Money>("\"79228162514264337593543950\"").is_err());
    }

    #[test]
    fn test_times_and_sum() {
        let price = Money::from_cents(250);
        let total = Money::checked_sum([price.checked_times(3).unwrap(), Money::from_cents(125)]);
        assert_eq!(total, Some(Money::from_cents(875)));
    }

    #[test]
    fn test_checked_arithmetic_stops_at_limit() {
        let max = Money::new(Decimal::new(Money::MAX_CENTS, 2)).unwrap();
        assert_eq!(max.checked_times(1), Some(max));
        assert_eq!(max.checked_times(2), None);
        assert_eq!(
            Money::from_cents(1).checked_times(u32::MAX),
            Money::new(Decimal::new(i64::from(u32::MAX), 2)).ok()
        );
        assert_eq!(max.checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::checked_sum([max, max]), None);
        assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
    }

    #[test]
    fn test_deserializes_from_string_and_number() {
        let from_str: Money = serde_json::from_str("\"12.50\"").unwrap();
        let from_num: Money = serde_json::from_str("12.5").unwrap();
        assert_eq!(from_str, Money::from_cents(1250));
        assert_eq!(from_num, Money::from_cents(1250));
        assert!(serde_json::from_str::<Money>("\"-3\"").is_err());
    }
}
