//! [`Money`]-related definitions.

use std::{fmt, ops};

use derive_more::{Display, Error};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::define_kind;

/// Amount of money in some [`Currency`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Number of decimal places [`Money`] is settled with.
    pub const SCALE: u32 = 2;

    /// Creates a zero [`Money`] amount in the provided [`Currency`].
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    /// Rounds this [`Money`] to [`Money::SCALE`] decimal places, with
    /// midpoints rounded away from zero (`5.625` becomes `5.63`).
    #[must_use]
    pub fn round(self) -> Self {
        let mut amount = self.amount.round_dp_with_strategy(
            Self::SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        );
        amount.rescale(Self::SCALE);
        Self {
            amount,
            currency: self.currency,
        }
    }

    /// Indicates whether this [`Money`] amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Adds the `other` [`Money`] to this one.
    ///
    /// # Errors
    ///
    /// If the [`Currency`]s of the amounts differ.
    pub fn checked_add(self, other: Self) -> Result<Self, CurrencyMismatch> {
        if self.currency != other.currency {
            return Err(CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(Self {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }
}

impl ops::Mul<Decimal> for Money {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self {
            amount: self.amount * rhs,
            currency: self.currency,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { amount, currency } = self;
        write!(f, "{amount:.2}{currency}")
    }
}

/// Error of combining [`Money`] amounts in different [`Currency`]s.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("expected `{expected}` amount, found `{found}`")]
pub struct CurrencyMismatch {
    /// [`Currency`] of the accumulated amount.
    pub expected: Currency,

    /// [`Currency`] of the amount being added.
    pub found: Currency,
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "US Dollar."]
        Usd = 1,

        #[doc = "Euro."]
        Eur = 2,

        #[doc = "Pound Sterling."]
        Gbp = 3,

        #[doc = "Canadian Dollar."]
        Cad = 4,
    }
}
