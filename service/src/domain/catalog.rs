//! Service catalog definitions.

use common::{define_kind, Date, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Service offered in some city by some tenant during a season.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// ID of this [`Entry`].
    pub id: Id,

    /// Human-readable name of this [`Entry`].
    pub name: String,

    /// [`Category`] of this [`Entry`].
    pub category: Category,

    /// [`PriceModel`] converting the [`Entry::rate`] into a price.
    pub price_model: PriceModel,

    /// Rate of this [`Entry`] per its [`Entry::unit`].
    pub rate: Money,

    /// Unit the [`Entry::rate`] is given per (`hour`, `sqft`, `load`, etc.).
    pub unit: String,

    /// Description of this [`Entry`].
    pub description: Option<String>,

    /// Icon identifier used by clients to render this [`Entry`].
    pub icon: Option<String>,

    /// First day this [`Entry`] is offered.
    pub season_start: Date,

    /// Last day this [`Entry`] is offered.
    pub season_end: Date,

    /// [`CityCode`] this [`Entry`] is offered in.
    pub city_code: CityCode,

    /// [`TenantId`] this [`Entry`] belongs to.
    pub tenant_id: TenantId,
}

impl Entry {
    /// Indicates whether this [`Entry`] can be ordered at the provided moment
    /// within the provided [`Scope`].
    #[must_use]
    pub fn is_eligible<Of: ?Sized>(
        &self,
        at: DateTimeOf<Of>,
        scope: &Scope,
    ) -> bool {
        let day = at.date();
        self.season_start <= day
            && day <= self.season_end
            && self.city_code == scope.city_code
            && self.tenant_id == scope.tenant_id
    }
}

/// ID of an [`Entry`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Category of an [`Entry`]."]
    enum Category {
        #[doc = "Main service of a job."]
        Main = 1,

        #[doc = "Optional add-on to a main service."]
        Extra = 2,
    }
}

define_kind! {
    #[doc = "Formula converting a rate of an [`Entry`] into a price."]
    enum PriceModel {
        #[doc = "Rate per hour of work."]
        PerHour = 1,

        #[doc = "Rate per square foot of the property."]
        PerSqft = 2,

        #[doc = "Fixed rate."]
        Flat = 3,

        #[doc = "Fixed rate per visit."]
        PerVisit = 4,

        #[doc = "Rate per laundry load."]
        PerLoad = 5,

        #[doc = "Rate per single item."]
        PerUnit = 6,

        #[doc = "Rate per bedroom."]
        PerRoom = 7,
    }
}

/// Code of a city the services are offered in (`NYC`, for example).
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CityCode(String);

impl CityCode {
    /// Creates a new [`CityCode`] if the given `code` is valid.
    ///
    /// The code is trimmed and uppercased.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim().to_uppercase();
        let valid = !code.is_empty()
            && code.len() <= 16
            && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        valid.then_some(Self(code))
    }
}

impl FromStr for CityCode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CityCode`")
    }
}

/// ID of a tenant operating a catalog.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct TenantId(i32);

/// Catalog visible to a customer.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Scope {
    /// [`CityCode`] of the catalog.
    pub city_code: CityCode,

    /// [`TenantId`] of the catalog.
    pub tenant_id: TenantId,
}

#[cfg(test)]
pub(crate) mod fixture {
    use common::{money::Currency, Date, Money};
    use rust_decimal::Decimal;

    use super::{Category, CityCode, Entry, Id, PriceModel, TenantId};

    /// Returns a main hourly [`Entry`] offered in `NYC` by tenant `1`
    /// throughout 2025.
    pub(crate) fn entry() -> Entry {
        Entry {
            id: Id::new(),
            name: "General Cleaning".into(),
            category: Category::Main,
            price_model: PriceModel::PerHour,
            rate: Money {
                amount: Decimal::new(2750, 2),
                currency: Currency::Usd,
            },
            unit: "hour".into(),
            description: None,
            icon: None,
            season_start: Date::parse("2025-01-01").unwrap(),
            season_end: Date::parse("2025-12-31").unwrap(),
            city_code: CityCode::new("NYC").unwrap(),
            tenant_id: TenantId::from(1),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{fixture, CityCode, Scope, TenantId};

    fn scope(city: &str, tenant: i32) -> Scope {
        Scope {
            city_code: CityCode::new(city).unwrap(),
            tenant_id: TenantId::from(tenant),
        }
    }

    #[test]
    fn eligible_within_season_and_scope() {
        let entry = fixture::entry();
        let at = |s: &str| DateTime::from_rfc3339(s).unwrap();

        assert!(entry.is_eligible(at("2025-01-01T00:00:00Z"), &scope("NYC", 1)));
        assert!(entry.is_eligible(at("2025-12-31T23:59:59Z"), &scope("nyc", 1)));
        assert!(!entry.is_eligible(at("2026-01-01T00:00:00Z"), &scope("NYC", 1)));
        assert!(!entry.is_eligible(at("2024-12-31T23:59:59Z"), &scope("NYC", 1)));
        assert!(!entry.is_eligible(at("2025-06-01T00:00:00Z"), &scope("SFO", 1)));
        assert!(!entry.is_eligible(at("2025-06-01T00:00:00Z"), &scope("NYC", 2)));
    }

    #[test]
    fn normalizes_city_codes() {
        assert_eq!(AsRef::<str>::as_ref(&CityCode::new(" nyc ").unwrap()), "NYC");
        assert!(CityCode::new("").is_none());
        assert!(CityCode::new("new york").is_none());
    }
}
