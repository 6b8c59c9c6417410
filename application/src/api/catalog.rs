//! Service catalog definitions.

use common::{Date, DateTime, Money};
use serde::{Deserialize, Serialize};
use service::{
    domain::catalog::{self, Category, PriceModel},
    query, read, Command as _,
};

use crate::{
    api::{self, non_blank, Json, Query},
    error::Validation,
    AsError, Context, Error,
};

/// Service offered by a tenant in a city.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier of this `Entry`.
    pub id: catalog::Id,

    /// Human-readable name.
    pub name: String,

    /// Whether this is a main service or an add-on.
    pub category: Category,

    /// How the `rate` turns into a price.
    pub price_model: PriceModel,

    /// Rate per `unit`.
    pub rate: Money,

    /// Unit of the `rate`.
    pub unit: String,

    /// Description of the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Icon to render the service with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// First day the service is offered.
    pub season_start: Date,

    /// Last day the service is offered.
    pub season_end: Date,

    /// City the service is offered in.
    pub city_code: String,

    /// Tenant offering the service.
    pub tenant_id: catalog::TenantId,
}

impl From<catalog::Entry> for Entry {
    fn from(e: catalog::Entry) -> Self {
        Self {
            id: e.id,
            name: e.name,
            category: e.category,
            price_model: e.price_model,
            rate: e.rate,
            unit: e.unit,
            description: e.description,
            icon: e.icon,
            season_start: e.season_start,
            season_end: e.season_end,
            city_code: e.city_code.to_string(),
            tenant_id: e.tenant_id,
        }
    }
}

/// Catalog being browsed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Code of the city.
    city_code: Option<String>,

    /// ID of the tenant.
    #[serde(alias = "tenantID")]
    tenant_id: Option<String>,
}

impl Scope {
    /// Validates this [`Scope`], recording invalid fields.
    fn parse(self, v: &mut Validation) -> Option<catalog::Scope> {
        let city_code = v.check(
            "cityCode",
            non_blank(self.city_code).and_then(catalog::CityCode::new),
            "is required",
        );
        let tenant_id = v.check(
            "tenantId",
            non_blank(self.tenant_id).and_then(|t| t.parse().ok()),
            "must be a tenant number",
        );
        Some(catalog::Scope {
            city_code: city_code?,
            tenant_id: tenant_id?,
        })
    }
}

/// Lists services offered today within the provided catalog.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELDS` - `cityCode` or `tenantId` is missing.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "serviceCatalog",
        city_code = ?scope.city_code,
        otel.name = api::SPAN_NAME,
        tenant_id = ?scope.tenant_id,
    ),
)]
pub async fn offered(
    ctx: Context,
    Query(scope): Query<Scope>,
) -> Result<Json<Vec<Entry>>, Error> {
    let mut v = Validation::new();
    let Some(scope) = scope.parse(&mut v) else {
        return Err(v.into_error());
    };

    ctx.service()
        .execute(query::catalog::Offered::by(read::catalog::Offered {
            scope,
            on: DateTime::now().date(),
        }))
        .await
        .map_err(AsError::into_error)
        .map(|entries| Json(entries.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod spec {
    use service::domain::catalog;

    use crate::error::Validation;

    use super::Scope;

    #[test]
    fn requires_city_and_tenant() {
        let mut v = Validation::new();
        let scope = Scope {
            city_code: Some(" ".into()),
            tenant_id: Some("one".into()),
        }
        .parse(&mut v);

        assert!(scope.is_none());
        let err = v.finish().unwrap_err();
        assert_eq!(
            err.fields.iter().map(|f| f.field).collect::<Vec<_>>(),
            ["cityCode", "tenantId"],
        );
    }

    #[test]
    fn normalizes_city_code() {
        let mut v = Validation::new();
        let scope = Scope {
            city_code: Some("nyc".into()),
            tenant_id: Some("7".into()),
        }
        .parse(&mut v)
        .unwrap();

        assert!(v.finish().is_ok());
        assert_eq!(AsRef::<str>::as_ref(&scope.city_code), "NYC");
        assert_eq!(scope.tenant_id, catalog::TenantId::from(7));
    }
}
