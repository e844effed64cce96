//! Catalog price stored as `NUMERIC(10,2)`.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("The Price field is not a valid number.")]
    NotANumber,
    #[error("The Price field must not be negative.")]
    Negative,
    #[error("The Price field allows at most {max} decimal places.")]
    TooPrecise { max: u32 },
    #[error("The Price field allows at most {max} digits.")]
    TooLarge { max: u32 },
}

/// A non-negative amount with at most two fractional digits and ten
/// significant digits.
///
/// Serializes as a decimal string so no precision is lost in JSON; accepts
/// either a string or a number when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub const SCALE: u32 = 2;
    pub const PRECISION: u32 = 10;

    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate a decimal amount.
    ///
    /// Trailing fractional zeros are ignored, so `9.990` is accepted as `9.99`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for negative amounts or amounts that do not fit
    /// `NUMERIC(10,2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        let amount = amount.normalize();
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.scale() > Self::SCALE {
            return Err(PriceError::TooPrecise { max: Self::SCALE });
        }
        let integer_digits = Self::PRECISION - Self::SCALE;
        if amount.trunc().abs() >= Decimal::from(10_i64.pow(integer_digits)) {
            return Err(PriceError::TooLarge {
                max: Self::PRECISION,
            });
        }
        let mut amount = amount;
        amount.rescale(Self::SCALE);
        Ok(Self(amount))
    }

    /// Build from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), Self::SCALE))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `self * quantity`, as used for cart line totals.
    #[must_use]
    pub fn times(&self, quantity: i32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::NotANumber)?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
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
    fn test_parse_and_display() {
        assert_eq!("9.99".parse::<Price>().unwrap().to_string(), "9.99");
        assert_eq!("5".parse::<Price>().unwrap().to_string(), "5.00");
        assert_eq!("1.50".parse::<Price>().unwrap(), Price::from_cents(150));
        assert_eq!("9.990".parse::<Price>().unwrap(), Price::from_cents(999));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!("abc".parse::<Price>(), Err(PriceError::NotANumber));
        assert_eq!("-1".parse::<Price>(), Err(PriceError::Negative));
        assert_eq!(
            "1.234".parse::<Price>(),
            Err(PriceError::TooPrecise { max: 2 })
        );
        assert_eq!(
            "100000000".parse::<Price>(),
            Err(PriceError::TooLarge { max: 10 })
        );
        assert!("99999999.99".parse::<Price>().is_ok());
    }

    #[test]
    fn test_json_accepts_string_or_number() {
        let from_str: Price = serde_json::from_str("\"9.99\"").unwrap();
        let from_num: Price = serde_json::from_str("9.99").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"9.99\"");
    }

    #[test]
    fn test_times() {
        let price = Price::from_cents(250);
        assert_eq!(price.times(3).to_string(), "7.50");
    }
}
