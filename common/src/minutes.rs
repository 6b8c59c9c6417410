//! [`Minutes`]-related definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::time::Duration;

use derive_more::{Add, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use rust_decimal::Decimal;

/// Non-negative whole number of minutes.
#[derive(
    Add,
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(transparent)
)]
pub struct Minutes(u32);

impl Minutes {
    /// Creates new [`Minutes`].
    #[must_use]
    pub const fn new(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Returns the number of whole [`Minutes`] in the provided [`Duration`].
    ///
    /// [`None`] is returned if the [`Duration`] doesn't fit.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Option<Self> {
        u32::try_from(duration.as_secs() / 60).ok().map(Self)
    }

    /// Returns the inner number of minutes.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns these [`Minutes`] as a fractional number of hours.
    #[must_use]
    pub fn hours(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(60)
    }
}

#[cfg(feature = "postgres")]
impl FromSql<'_> for Minutes {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(Self(u32::try_from(i32::from_sql(ty, raw)?)?))
    }
}

#[cfg(feature = "postgres")]
impl ToSql for Minutes {
    accepts!(INT4);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        i32::try_from(self.0)?.to_sql(ty, w)
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::Minutes;

    #[test]
    fn converts_to_hours() {
        assert_eq!(Minutes::new(90).hours(), Decimal::new(15, 1));
        assert_eq!(Minutes::new(330).hours(), Decimal::new(55, 1));
        assert_eq!(Minutes::new(0).hours(), Decimal::ZERO);
    }

    #[test]
    fn truncates_durations() {
        assert_eq!(
            Minutes::from_duration(Duration::from_secs(90 * 60 + 59)),
            Some(Minutes::new(90)),
        );
    }
}
