//! Pricing rules and estimation of cleaning jobs.
//!
//! All the tables live in a [`Policy`], which is loaded from configuration
//! and injected into the [`Service`].
//!
//! [`Service`]: crate::Service

use common::{
    define_kind,
    money::{Currency, CurrencyMismatch},
    Minutes, Money, Percent,
};
use derive_more::{AsRef, Display, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::domain::catalog::{self, PriceModel};

define_kind! {
    #[doc = "Coarse service type used by legacy quotations."]
    enum ServiceType {
        #[doc = "Regular cleaning."]
        GeneralCleaning = 1,

        #[doc = "Thorough top-to-bottom cleaning."]
        DeepCleaning = 2,

        #[doc = "Cleaning before moving in or after moving out."]
        MoveInOut = 3,

        #[doc = "Cleaning after a renovation."]
        PostConstruction = 4,

        #[doc = "Window cleaning."]
        WindowCleaning = 5,
    }
}

impl ServiceType {
    /// Parses a [`ServiceType`] leniently: anything unknown is treated as
    /// [`ServiceType::GeneralCleaning`].
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::GeneralCleaning)
    }
}

define_kind! {
    #[doc = "Type of a cleaned property."]
    enum PropertyType {
        #[doc = "Apartment."]
        Apartment = 1,

        #[doc = "Detached house."]
        House = 2,

        #[doc = "Condominium."]
        Condo = 3,

        #[doc = "Office or commercial space."]
        Office = 4,

        #[doc = "Anything else."]
        Other = 5,
    }
}

impl PropertyType {
    /// Parses a [`PropertyType`] leniently: anything unknown is treated as
    /// absent.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

/// Square-footage band of a property, as chosen by a customer
/// (`<500`, `500-999`, ..., `3000+`).
///
/// Bands are kept verbatim and only interpreted by [`Policy::square_feet()`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct SquareFootage(String);

impl SquareFootage {
    /// Creates a new [`SquareFootage`] band, trimming surrounding whitespace.
    ///
    /// [`None`] is returned for blank input.
    #[must_use]
    pub fn new(band: impl AsRef<str>) -> Option<Self> {
        let band = band.as_ref().trim();
        (!band.is_empty() && band.len() <= 32).then(|| Self(band.to_owned()))
    }

    /// Returns the bounds of this band, if it's a `min-max` range.
    fn range(&self) -> Option<(u32, u32)> {
        let (min, max) = self.0.split_once('-')?;
        Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
    }

    /// Returns the lower bound of this band, if it's an open-ended `min+`.
    fn open_ended(&self) -> Option<u32> {
        self.0.strip_suffix('+')?.trim().parse().ok()
    }
}

/// Count of rooms or items (at least one).
#[derive(
    Clone, Copy, Debug, Display, Eq, Into, Ord, PartialEq, PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Count(i16);

impl Count {
    /// [`Count`] of one.
    pub const ONE: Self = Self(1);

    /// Creates a new [`Count`] if the given value is positive.
    #[must_use]
    pub fn new(count: impl TryInto<i16>) -> Option<Self> {
        count.try_into().ok().filter(|c| *c >= 1).map(Self)
    }

    /// Returns this [`Count`] as [`Decimal`].
    #[must_use]
    pub fn decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Returns this [`Count`] as [`u32`].
    #[must_use]
    pub fn u32(self) -> u32 {
        u32::from(self.0.unsigned_abs())
    }
}

impl Default for Count {
    fn default() -> Self {
        Self::ONE
    }
}

/// Property attributes affecting an estimate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attributes {
    /// [`PropertyType`] of the property, if known.
    pub property_type: Option<PropertyType>,

    /// Number of bedrooms.
    pub bedrooms: Count,

    /// Number of bathrooms.
    pub bathrooms: Count,

    /// [`SquareFootage`] band of the property, if chosen.
    pub square_footage: Option<SquareFootage>,

    /// Number of laundry loads.
    pub laundry_loads: Count,
}

/// Estimated duration and price of a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Estimate {
    /// Estimated duration.
    pub duration: Minutes,

    /// Estimated price, if any priced service is selected.
    pub price: Option<Money>,
}

/// Quote summary shown to a customer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Summary {
    /// Estimated price before taxes.
    pub subtotal: Money,

    /// Value-added tax of the [`Summary::subtotal`].
    pub vat: Money,

    /// Total to be paid.
    pub total: Money,
}

impl Summary {
    /// Builds a [`Summary`] of the provided estimated price.
    #[must_use]
    pub fn new(subtotal: Money, vat_rate: Percent) -> Self {
        let subtotal = subtotal.round();
        let vat = vat_rate.of(subtotal).round();
        Self {
            subtotal,
            vat,
            total: Money {
                amount: subtotal.amount + vat.amount,
                currency: subtotal.currency,
            },
        }
    }
}

/// Pricing tables and estimation constants.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Policy {
    /// Base duration of any job.
    #[default(Minutes::new(120))]
    pub base_duration: Minutes,

    /// Additional duration per bedroom.
    #[default(Minutes::new(30))]
    pub per_bedroom: Minutes,

    /// Additional duration per bathroom.
    #[default(Minutes::new(45))]
    pub per_bathroom: Minutes,

    /// Additional duration per every whole [`Policy::area_block`].
    #[default(Minutes::new(15))]
    pub per_area_block: Minutes,

    /// Square feet in an area block.
    #[default(500)]
    pub area_block: u32,

    /// Square feet assumed when no usable band is provided.
    #[default(1000)]
    pub default_square_feet: u32,

    /// Square feet assumed for an open-ended band (`3000+`).
    #[default(3500)]
    pub open_ended_square_feet: u32,

    /// Minimal number of hourly units billed for an hourly main service.
    #[default(2)]
    pub min_hourly_units: u32,

    /// [`Currency`] of legacy estimates.
    #[default(Currency::Usd)]
    pub currency: Currency,

    /// Hourly base rates of legacy [`ServiceType`]s.
    pub base_rates: BaseRates,

    /// Price multipliers of [`PropertyType`]s.
    pub multipliers: Multipliers,
}

/// Hourly base rates per [`ServiceType`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct BaseRates {
    /// Rate of [`ServiceType::GeneralCleaning`].
    #[default(Decimal::from(30))]
    pub general_cleaning: Decimal,

    /// Rate of [`ServiceType::DeepCleaning`].
    #[default(Decimal::from(45))]
    pub deep_cleaning: Decimal,

    /// Rate of [`ServiceType::MoveInOut`].
    #[default(Decimal::from(50))]
    pub move_in_out: Decimal,

    /// Rate of [`ServiceType::PostConstruction`].
    #[default(Decimal::from(55))]
    pub post_construction: Decimal,

    /// Rate of [`ServiceType::WindowCleaning`].
    #[default(Decimal::from(40))]
    pub window_cleaning: Decimal,
}

impl BaseRates {
    /// Returns the hourly rate of the provided [`ServiceType`].
    #[must_use]
    pub const fn get(&self, ty: ServiceType) -> Decimal {
        match ty {
            ServiceType::GeneralCleaning => self.general_cleaning,
            ServiceType::DeepCleaning => self.deep_cleaning,
            ServiceType::MoveInOut => self.move_in_out,
            ServiceType::PostConstruction => self.post_construction,
            ServiceType::WindowCleaning => self.window_cleaning,
        }
    }
}

/// Price multipliers per [`PropertyType`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Multipliers {
    /// Multiplier of [`PropertyType::Apartment`].
    #[default(Decimal::ONE)]
    pub apartment: Decimal,

    /// Multiplier of [`PropertyType::House`].
    #[default(Decimal::new(12, 1))]
    pub house: Decimal,

    /// Multiplier of [`PropertyType::Condo`].
    #[default(Decimal::new(11, 1))]
    pub condo: Decimal,

    /// Multiplier of [`PropertyType::Office`].
    #[default(Decimal::new(13, 1))]
    pub office: Decimal,

    /// Multiplier of [`PropertyType::Other`].
    #[default(Decimal::ONE)]
    pub other: Decimal,
}

impl Multipliers {
    /// Returns the multiplier of the provided [`PropertyType`], if any.
    #[must_use]
    pub const fn get(&self, ty: Option<PropertyType>) -> Decimal {
        match ty {
            Some(PropertyType::Apartment) => self.apartment,
            Some(PropertyType::House) => self.house,
            Some(PropertyType::Condo) => self.condo,
            Some(PropertyType::Office) => self.office,
            Some(PropertyType::Other) | None => self.other,
        }
    }
}

impl Policy {
    /// Returns the representative number of square feet of the provided
    /// [`SquareFootage`] band.
    ///
    /// A `min-max` range yields its floored midpoint, `3000+` yields
    /// [`Policy::open_ended_square_feet`], anything else (including `<500`)
    /// yields [`Policy::default_square_feet`].
    #[must_use]
    pub fn square_feet(&self, band: Option<&SquareFootage>) -> u32 {
        let Some(band) = band else {
            return self.default_square_feet;
        };
        if let Some((min, max)) = band.range() {
            let mid = (u64::from(min) + u64::from(max)) / 2;
            return u32::try_from(mid).unwrap_or(u32::MAX);
        }
        if band.open_ended().is_some() {
            return self.open_ended_square_feet;
        }
        self.default_square_feet
    }

    /// Estimates the duration of a job on a property with the provided
    /// [`Attributes`].
    #[must_use]
    pub fn duration(&self, attrs: &Attributes) -> Minutes {
        let sqft = self.square_feet(attrs.square_footage.as_ref());
        let blocks = sqft.checked_div(self.area_block).unwrap_or_default();

        Minutes::new(
            self.base_duration
                .get()
                .saturating_add(
                    attrs.bedrooms.u32().saturating_mul(self.per_bedroom.get()),
                )
                .saturating_add(
                    attrs.bathrooms.u32().saturating_mul(self.per_bathroom.get()),
                )
                .saturating_add(blocks.saturating_mul(self.per_area_block.get())),
        )
    }

    /// Estimates the price of a legacy [`ServiceType`] job lasting the
    /// provided `duration`.
    #[must_use]
    pub fn legacy_price(
        &self,
        ty: ServiceType,
        property: Option<PropertyType>,
        duration: Minutes,
    ) -> Money {
        Money {
            amount: self.base_rates.get(ty)
                * self.multipliers.get(property)
                * duration.hours(),
            currency: self.currency,
        }
        .round()
    }

    /// Estimates the price of the provided catalog services.
    ///
    /// [`None`] is returned if the services sum up to zero.
    ///
    /// # Errors
    ///
    /// If the services are priced in different currencies.
    pub fn catalog_price<'e>(
        &self,
        attrs: &Attributes,
        main: impl IntoIterator<Item = &'e catalog::Entry>,
        extras: impl IntoIterator<Item = &'e catalog::Entry>,
    ) -> Result<Option<Money>, CurrencyMismatch> {
        let sqft = Decimal::from(
            self.square_feet(attrs.square_footage.as_ref()),
        );
        let hourly_units = Decimal::from(
            (attrs.bedrooms.u32() + attrs.bathrooms.u32())
                .max(self.min_hourly_units),
        );

        let contribution = |entry: &catalog::Entry, is_main: bool| {
            let quantity = match entry.price_model {
                PriceModel::PerHour if is_main => hourly_units,
                PriceModel::PerSqft => sqft,
                PriceModel::PerLoad => attrs.laundry_loads.decimal(),
                PriceModel::PerRoom => attrs.bedrooms.decimal(),
                PriceModel::PerHour
                | PriceModel::PerUnit
                | PriceModel::Flat
                | PriceModel::PerVisit => Decimal::ONE,
            };
            entry.rate * quantity
        };

        let mut total: Option<Money> = None;
        let items = main
            .into_iter()
            .map(|e| contribution(e, true))
            .chain(extras.into_iter().map(|e| contribution(e, false)));
        for item in items {
            total = Some(match total {
                Some(sum) => sum.checked_add(item)?,
                None => item,
            });
        }

        Ok(total.filter(|t| !t.is_zero()).map(Money::round))
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Minutes, Money, Percent};
    use rust_decimal::Decimal;

    use crate::domain::catalog::{self, Category, PriceModel};

    use super::{
        Attributes, Count, Policy, PropertyType, ServiceType, SquareFootage,
    };

    fn band(s: &str) -> Option<SquareFootage> {
        SquareFootage::new(s)
    }

    fn usd(cents: i64) -> Money {
        Money {
            amount: Decimal::new(cents, 2),
            currency: Currency::Usd,
        }
    }

    fn entry(model: PriceModel, category: Category, rate: Money) -> catalog::Entry {
        catalog::Entry {
            price_model: model,
            category,
            rate,
            ..catalog::fixture::entry()
        }
    }

    #[test]
    fn normalizes_square_footage() {
        let policy = Policy::default();
        let sqft = |s: &str| policy.square_feet(band(s).as_ref());

        assert_eq!(policy.square_feet(None), 1000);
        assert_eq!(sqft("3000+"), 3500);
        assert_eq!(sqft("500-999"), 749);
        assert_eq!(sqft("1000-1499"), 1249);
        assert_eq!(sqft("2500-2999"), 2749);
        assert_eq!(sqft("<500"), 1000);
        assert_eq!(sqft("abc-999"), 1000);
        assert_eq!(sqft("huge"), 1000);
        assert_eq!(sqft("4000000000-4000000000"), 4_000_000_000);
        assert_eq!(sqft("4294967295-4294967295"), u32::MAX);
        assert_eq!(sqft("99999999999-100"), 1000);
        assert!(SquareFootage::new("  ").is_none());
    }

    #[test]
    fn bounded_bands_stay_within_their_bounds() {
        let policy = Policy::default();
        for (min, max) in [
            (500, 999),
            (1000, 1499),
            (1500, 1999),
            (2000, 2499),
            (2500, 2999),
        ] {
            let sqft = policy.square_feet(band(&format!("{min}-{max}")).as_ref());
            assert!((min..=max).contains(&sqft), "{sqft} out of {min}-{max}");
        }
    }

    #[test]
    fn estimates_duration() {
        let policy = Policy::default();
        let attrs = Attributes {
            bedrooms: Count::new(3).unwrap(),
            bathrooms: Count::new(2).unwrap(),
            square_footage: band("1500-1999"),
            ..Attributes::default()
        };

        // 120 + 90 + 90 + floor(1749 / 500) * 15
        assert_eq!(policy.duration(&attrs), Minutes::new(345));
        assert_eq!(policy.duration(&Attributes::default()), Minutes::new(225));
    }

    #[test]
    fn estimates_duration_of_extreme_band() {
        let policy = Policy::default();
        let attrs = Attributes {
            square_footage: band("4294967295-4294967295"),
            ..Attributes::default()
        };

        // 120 + 30 + 45 + floor(4294967295 / 500) * 15
        assert_eq!(policy.duration(&attrs), Minutes::new(128_849_205));
    }

    #[test]
    fn prices_legacy_deep_cleaning_of_house() {
        let policy = Policy::default();
        let attrs = Attributes {
            property_type: Some(PropertyType::House),
            bedrooms: Count::new(3).unwrap(),
            bathrooms: Count::new(2).unwrap(),
            ..Attributes::default()
        };
        let duration = policy.duration(&attrs);

        assert_eq!(duration, Minutes::new(330));
        assert_eq!(
            policy.legacy_price(
                ServiceType::DeepCleaning,
                attrs.property_type,
                duration,
            ),
            usd(29700),
        );
    }

    #[test]
    fn falls_back_for_unknown_legacy_inputs() {
        let policy = Policy::default();

        assert_eq!(ServiceType::parse_lenient("SPRING_CLEAN"), ServiceType::GeneralCleaning);
        assert_eq!(PropertyType::parse_lenient("CASTLE"), None);
        assert_eq!(
            policy.legacy_price(ServiceType::GeneralCleaning, None, Minutes::new(90)),
            usd(4500),
        );
    }

    #[test]
    fn prices_catalog_services() {
        let policy = Policy::default();
        let hourly = entry(PriceModel::PerHour, Category::Main, usd(3000));
        let fridge = entry(PriceModel::Flat, Category::Extra, usd(3200));
        let attrs = Attributes::default();

        // 30 * max(2, 1 + 1) + 32
        assert_eq!(
            policy.catalog_price(&attrs, [&hourly], [&fridge]).unwrap(),
            Some(usd(9200)),
        );
    }

    #[test]
    fn bills_at_least_minimal_hourly_units() {
        let policy = Policy::default();
        let hourly = entry(PriceModel::PerHour, Category::Main, usd(2750));

        for (bedrooms, bathrooms) in [(1, 1), (2, 1), (4, 3)] {
            let attrs = Attributes {
                bedrooms: Count::new(bedrooms).unwrap(),
                bathrooms: Count::new(bathrooms).unwrap(),
                ..Attributes::default()
            };
            let price = policy
                .catalog_price(&attrs, [&hourly], [])
                .unwrap()
                .unwrap();
            assert!(price.amount >= Decimal::new(2750, 2) * Decimal::TWO);
        }

        // Extras are billed per single hour.
        let price = policy
            .catalog_price(&Attributes::default(), [], [&hourly])
            .unwrap();
        assert_eq!(price, Some(usd(2750)));
    }

    #[test]
    fn prices_quantity_models() {
        let policy = Policy::default();
        let attrs = Attributes {
            bedrooms: Count::new(3).unwrap(),
            laundry_loads: Count::new(2).unwrap(),
            square_footage: band("500-999"),
            ..Attributes::default()
        };
        let laundry = entry(PriceModel::PerLoad, Category::Extra, usd(1600));
        let baseboards = entry(PriceModel::PerRoom, Category::Extra, usd(1600));
        let exteriors = entry(PriceModel::PerSqft, Category::Main, usd(35));

        // 0.35 * 749 + 16 * 2 + 16 * 3
        assert_eq!(
            policy
                .catalog_price(&attrs, [&exteriors], [&laundry, &baseboards])
                .unwrap(),
            Some(usd(34215)),
        );
    }

    #[test]
    fn zero_total_is_no_estimate() {
        let policy = Policy::default();
        let free = entry(PriceModel::Flat, Category::Main, usd(0));

        assert_eq!(
            policy.catalog_price(&Attributes::default(), [&free], []).unwrap(),
            None,
        );
        assert_eq!(
            policy.catalog_price(&Attributes::default(), [], []).unwrap(),
            None,
        );
    }

    #[test]
    fn rejects_mixed_currencies() {
        let policy = Policy::default();
        let usd_entry = entry(PriceModel::Flat, Category::Main, usd(1000));
        let eur_entry = entry(
            PriceModel::Flat,
            Category::Extra,
            Money {
                currency: Currency::Eur,
                ..usd(1000)
            },
        );

        assert!(policy
            .catalog_price(&Attributes::default(), [&usd_entry], [&eur_entry])
            .is_err());
    }

    #[test]
    fn summarizes_with_vat() {
        let summary = super::Summary::new(usd(29700), "7".parse::<Percent>().unwrap());

        assert_eq!(summary.subtotal, usd(29700));
        assert_eq!(summary.vat, usd(2079));
        assert_eq!(summary.total, usd(31779));
    }
}
