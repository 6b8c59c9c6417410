//! [`Quotation`]-related definitions.

use axum::http::StatusCode;
use common::{Date, DateTime, Minutes, Money, Percent};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, estimate_quotation, update_quotation},
    domain::{
        self, catalog,
        pricing::{self, Count, PropertyType, ServiceType, SquareFootage},
        quotation::{
            self, Contact, Frequency, Guest, Location, Requestor, Selection,
            Zipcode,
        },
        user,
    },
    query, read, Command as _,
};

use crate::{
    api::{self, non_blank, nullable, Json, Path},
    define_error,
    error::{Field, Validation},
    AsError, Context, Error,
};

/// Price quotation of a cleaning job.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    /// Unique identifier of this `Quotation`.
    pub id: quotation::Id,

    /// Status of this `Quotation` at the moment of the response.
    pub status: quotation::Status,

    /// Customer owning this `Quotation`, unless requested by a guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<user::Id>,

    /// Name of the requesting guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// Email of the requesting guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,

    /// Phone of the requesting guest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,

    /// Main catalog services.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_ids: Vec<catalog::Id>,

    /// Add-on catalog services.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_service_ids: Vec<catalog::Id>,

    /// City of the catalog the services are chosen from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,

    /// Tenant of the catalog the services are chosen from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<catalog::TenantId>,

    /// Legacy service type, used instead of catalog services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_type: Option<ServiceType>,

    /// Type of the property.
    pub property_type: Option<PropertyType>,

    /// Number of bedrooms.
    pub bedrooms: u32,

    /// Number of bathrooms.
    pub bathrooms: u32,

    /// Square-footage band of the property.
    pub square_footage: Option<String>,

    /// Number of laundry loads.
    pub laundry_loads: u32,

    /// Postal code of the property.
    pub zipcode: String,

    /// Street address of the property.
    pub address: Option<String>,

    /// City of the property.
    pub city: Option<String>,

    /// How often the job repeats.
    pub frequency: Option<Frequency>,

    /// Estimated duration, in minutes.
    pub estimated_duration: Minutes,

    /// Estimated price, if anything priced is selected.
    pub estimated_price: Option<Money>,

    /// Quote summary of the `estimated_price`.
    pub summary: Option<Summary>,

    /// Free-form requirements.
    pub special_requirements: Option<String>,

    /// Preferred day of the job.
    pub preferred_date: Option<Date>,

    /// Preferred time of day.
    pub preferred_time: Option<String>,

    /// Maid assigned on acceptance.
    pub maid_id: Option<user::Id>,

    /// Until when this `Quotation` may be accepted.
    pub valid_until: DateTime,

    /// When this `Quotation` was requested.
    pub created_at: DateTime,

    /// When this `Quotation` was last changed.
    pub updated_at: DateTime,
}

impl Quotation {
    /// Creates a new [`Quotation`] of the provided [`domain::Quotation`] as
    /// observed at the provided moment.
    #[must_use]
    pub fn new(q: domain::Quotation, now: DateTime, vat: Percent) -> Self {
        let status = q.status_at(now);
        let (customer_id, guest) = match q.requestor {
            Requestor::Customer(id) => (Some(id), None),
            Requestor::Guest(g) => (None, Some(g)),
        };
        let (scope, service_ids, extra_service_ids, service_type) =
            match q.selection {
                Selection::Catalog {
                    scope,
                    main,
                    extras,
                } => (Some(scope), main, extras, None),
                Selection::Legacy(ty) => (None, vec![], vec![], Some(ty)),
            };
        let pricing::Attributes {
            property_type,
            bedrooms,
            bathrooms,
            square_footage,
            laundry_loads,
        } = q.attributes;

        Self {
            id: q.id,
            status,
            customer_id,
            customer_name: guest.as_ref().map(|g| g.name.to_string()),
            customer_email: guest
                .as_ref()
                .and_then(|g| g.contact.email())
                .map(ToString::to_string),
            customer_phone: guest
                .as_ref()
                .and_then(|g| g.contact.phone())
                .map(ToString::to_string),
            service_ids,
            extra_service_ids,
            city_code: scope.as_ref().map(|s| s.city_code.to_string()),
            tenant_id: scope.map(|s| s.tenant_id),
            service_type,
            property_type,
            bedrooms: bedrooms.u32(),
            bathrooms: bathrooms.u32(),
            square_footage: square_footage.map(|s| s.to_string()),
            laundry_loads: laundry_loads.u32(),
            zipcode: q.location.zipcode.to_string(),
            address: q.location.address,
            city: q.location.city,
            frequency: q.frequency,
            estimated_duration: q.estimated_duration,
            estimated_price: q.estimated_price,
            summary: q
                .estimated_price
                .map(|p| pricing::Summary::new(p, vat).into()),
            special_requirements: q.special_requirements,
            preferred_date: q.preferred_date,
            preferred_time: q.preferred_time,
            maid_id: q.provider_id,
            valid_until: q.valid_until.coerce(),
            created_at: q.created_at.coerce(),
            updated_at: q.updated_at.coerce(),
        }
    }
}

/// Quote summary of an estimated price.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Summary {
    /// Price before taxes.
    pub subtotal: Money,

    /// Value-added tax.
    pub vat: Money,

    /// Price to be paid.
    pub total: Money,
}

impl From<pricing::Summary> for Summary {
    fn from(s: pricing::Summary) -> Self {
        Self {
            subtotal: s.subtotal,
            vat: s.vat,
            total: s.total,
        }
    }
}

/// Estimate of a job, not persisted.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    /// Estimated duration, in minutes.
    pub estimated_duration: Minutes,

    /// Estimated price, if anything priced is selected.
    pub estimated_price: Option<Money>,

    /// Quote summary of the `estimated_price`.
    pub summary: Option<Summary>,
}

impl From<estimate_quotation::Output> for Estimate {
    fn from(o: estimate_quotation::Output) -> Self {
        Self {
            estimated_duration: o.estimate.duration,
            estimated_price: o.estimate.price,
            summary: o.summary.map(Into::into),
        }
    }
}

/// Services chosen in a request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Services {
    /// Main catalog services.
    service_ids: Option<Vec<catalog::Id>>,

    /// Add-on catalog services.
    extra_service_ids: Option<Vec<catalog::Id>>,

    /// City of the catalog.
    city_code: Option<String>,

    /// Tenant of the catalog.
    #[serde(alias = "tenantID")]
    tenant_id: Option<i32>,

    /// Legacy service type.
    service_type: Option<String>,
}

impl Services {
    /// Indicates whether nothing is chosen.
    fn is_empty(&self) -> bool {
        let Self {
            service_ids,
            extra_service_ids,
            city_code,
            tenant_id,
            service_type,
        } = self;
        service_ids.is_none()
            && extra_service_ids.is_none()
            && city_code.is_none()
            && tenant_id.is_none()
            && service_type.is_none()
    }

    /// Validates the chosen services, recording invalid fields.
    fn parse(self, v: &mut Validation) -> Option<Selection> {
        let catalog = self.service_ids.is_some()
            || self.extra_service_ids.is_some()
            || self.city_code.is_some()
            || self.tenant_id.is_some();

        match (catalog, non_blank(self.service_type)) {
            (true, Some(_)) => {
                v.reject(
                    "serviceType",
                    "must not be combined with catalog services",
                );
                None
            }
            (false, Some(ty)) => {
                Some(Selection::Legacy(ServiceType::parse_lenient(&ty)))
            }
            (false, None) => {
                v.reject(
                    "serviceIds",
                    "either `serviceIds` or `serviceType` must be provided",
                );
                None
            }
            (true, None) => {
                let main = v.check(
                    "serviceIds",
                    self.service_ids.filter(|ids| !ids.is_empty()),
                    "must contain at least one main service",
                );
                let city_code = v.check(
                    "cityCode",
                    non_blank(self.city_code)
                        .and_then(catalog::CityCode::new),
                    "must be a valid city code",
                );
                let tenant_id =
                    v.check("tenantId", self.tenant_id, "is required");
                Some(Selection::Catalog {
                    scope: catalog::Scope {
                        city_code: city_code?,
                        tenant_id: tenant_id?.into(),
                    },
                    main: main?,
                    extras: self.extra_service_ids.unwrap_or_default(),
                })
            }
        }
    }
}

/// Property attributes in a request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Property {
    /// Type of the property, unknown ones are ignored.
    property_type: Option<String>,

    /// Number of bedrooms.
    bedrooms: Option<i64>,

    /// Number of bathrooms.
    bathrooms: Option<i64>,

    /// Square-footage band, blank ones are ignored.
    square_footage: Option<String>,

    /// Number of laundry loads.
    laundry_loads: Option<i64>,
}

impl Property {
    /// Validates the attributes, recording invalid fields.
    fn parse(self, v: &mut Validation) -> Option<pricing::Attributes> {
        let bedrooms = count(v, "bedrooms", self.bedrooms);
        let bathrooms = count(v, "bathrooms", self.bathrooms);
        let laundry_loads = count(v, "laundryLoads", self.laundry_loads);
        Some(pricing::Attributes {
            property_type: self
                .property_type
                .as_deref()
                .and_then(PropertyType::parse_lenient),
            bedrooms: bedrooms?.unwrap_or_default(),
            bathrooms: bathrooms?.unwrap_or_default(),
            square_footage: self
                .square_footage
                .and_then(SquareFootage::new),
            laundry_loads: laundry_loads?.unwrap_or_default(),
        })
    }
}

/// Guest contacts in a request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contacts {
    /// Name of the guest.
    #[serde(alias = "guestName")]
    customer_name: Option<String>,

    /// Email of the guest.
    #[serde(alias = "guestEmail")]
    customer_email: Option<String>,

    /// Phone of the guest.
    customer_phone: Option<String>,

    /// Either an email or a phone of the guest.
    contact: Option<String>,
}

impl Contacts {
    /// Validates the only provided contact, recording invalid fields.
    ///
    /// `Some(None)` is returned if no contact is provided.
    fn parse(self, v: &mut Validation) -> Option<Option<Contact>> {
        let candidates: [(&'static str, _, fn(&str) -> Option<Contact>); 3] = [
            ("customerEmail", self.customer_email, |s| {
                user::Email::new(s).map(Contact::Email)
            }),
            ("customerPhone", self.customer_phone, |s| {
                user::Phone::new(s).map(Contact::Phone)
            }),
            ("contact", self.contact, Contact::classify),
        ];
        let mut provided = candidates
            .into_iter()
            .filter_map(|(field, raw, parse)| Some((field, non_blank(raw)?, parse)));

        let Some((field, raw, parse)) = provided.next() else {
            return Some(None);
        };
        if provided.next().is_some() {
            v.reject(
                "contact",
                "only one of `customerEmail`, `customerPhone` or `contact` \
                 may be provided",
            );
            return None;
        }
        v.check(
            field,
            parse(&raw),
            format!(
                "must be an email address or a phone number of at least {} \
                 digits",
                user::Phone::MIN_DIGITS,
            ),
        )
        .map(Some)
    }
}

/// Request of a new `Quotation`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Guest contacts, ignored for authenticated customers.
    #[serde(flatten)]
    contacts: Contacts,

    /// Requested services.
    #[serde(flatten)]
    services: Services,

    /// Property attributes.
    #[serde(flatten)]
    property: Property,

    /// Postal code of the property.
    zipcode: Option<String>,

    /// Street address of the property.
    address: Option<String>,

    /// City of the property.
    city: Option<String>,

    /// How often the job repeats.
    frequency: Option<String>,

    /// Free-form requirements.
    special_requirements: Option<String>,

    /// Preferred day of the job, unparseable ones are ignored.
    preferred_date: Option<String>,

    /// Preferred time of day.
    preferred_time: Option<String>,
}

/// Request of an estimate.
#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    /// Requested services.
    #[serde(flatten)]
    services: Services,

    /// Property attributes.
    #[serde(flatten)]
    property: Property,
}

/// Changes to a pending `Quotation`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Patch {
    /// Main catalog services, replacing the whole selection.
    service_ids: Option<Vec<catalog::Id>>,

    /// Add-on catalog services, replacing the whole selection.
    extra_service_ids: Option<Vec<catalog::Id>>,

    /// City of the catalog.
    city_code: Option<String>,

    /// Tenant of the catalog.
    tenant_id: Option<i32>,

    /// Legacy service type, replacing the whole selection.
    service_type: Option<String>,

    /// Type of the property.
    #[serde(deserialize_with = "nullable")]
    property_type: Option<Option<String>>,

    /// Number of bedrooms.
    bedrooms: Option<i64>,

    /// Number of bathrooms.
    bathrooms: Option<i64>,

    /// Square-footage band.
    #[serde(deserialize_with = "nullable")]
    square_footage: Option<Option<String>>,

    /// Number of laundry loads.
    laundry_loads: Option<i64>,

    /// Postal code of the property.
    zipcode: Option<String>,

    /// Street address of the property.
    #[serde(deserialize_with = "nullable")]
    address: Option<Option<String>>,

    /// City of the property.
    #[serde(deserialize_with = "nullable")]
    city: Option<Option<String>>,

    /// How often the job repeats.
    #[serde(deserialize_with = "nullable")]
    frequency: Option<Option<String>>,

    /// Free-form requirements.
    #[serde(deserialize_with = "nullable")]
    special_requirements: Option<Option<String>>,

    /// Preferred day of the job, unparseable ones become `null`.
    #[serde(deserialize_with = "nullable")]
    preferred_date: Option<Option<String>>,

    /// Preferred time of day.
    #[serde(deserialize_with = "nullable")]
    preferred_time: Option<Option<String>>,

    /// Name of the guest.
    customer_name: Option<String>,

    /// Email of the guest.
    customer_email: Option<String>,

    /// Phone of the guest.
    customer_phone: Option<String>,

    /// Either an email or a phone of the guest.
    contact: Option<String>,
}

impl Patch {
    /// Validates this [`Patch`], recording invalid fields.
    fn parse(self, v: &mut Validation) -> update_quotation::Patch {
        let services = Services {
            service_ids: self.service_ids,
            extra_service_ids: self.extra_service_ids,
            city_code: self.city_code,
            tenant_id: self.tenant_id,
            service_type: self.service_type,
        };
        let selection = (!services.is_empty())
            .then(|| services.parse(v))
            .flatten();
        let guest_name = self.customer_name.and_then(|n| {
            v.check("customerName", user::Name::new(n), "must not be blank")
        });
        let guest_contact = Contacts {
            customer_name: None,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            contact: self.contact,
        }
        .parse(v)
        .flatten();

        update_quotation::Patch {
            selection,
            property_type: self
                .property_type
                .map(|p| p.as_deref().and_then(PropertyType::parse_lenient)),
            bedrooms: count(v, "bedrooms", self.bedrooms).flatten(),
            bathrooms: count(v, "bathrooms", self.bathrooms).flatten(),
            square_footage: self
                .square_footage
                .map(|s| s.and_then(SquareFootage::new)),
            laundry_loads: count(v, "laundryLoads", self.laundry_loads)
                .flatten(),
            zipcode: self.zipcode.and_then(|z| zipcode(v, Some(z))),
            address: self.address.map(non_blank),
            city: self.city.map(non_blank),
            frequency: self.frequency.and_then(|f| frequency(v, f)),
            special_requirements: self.special_requirements.map(non_blank),
            preferred_date: self.preferred_date.map(preferred_date),
            preferred_time: self.preferred_time.map(non_blank),
            guest_name,
            guest_contact,
        }
    }
}

/// Decision to accept a `Quotation`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    /// Maid to do the job.
    #[serde(alias = "providerId")]
    maid_id: user::Id,
}

/// Validates an optional count, recording the `field` if it's not positive.
///
/// `Some(None)` is returned if no count is provided.
fn count(
    v: &mut Validation,
    field: &'static str,
    value: Option<i64>,
) -> Option<Option<Count>> {
    match value {
        None => Some(None),
        Some(n) => v
            .check(field, Count::new(n), "must be a positive number")
            .map(Some),
    }
}

/// Validates a required postal code, recording `zipcode` if it's invalid.
fn zipcode(v: &mut Validation, raw: Option<String>) -> Option<Zipcode> {
    v.check(
        "zipcode",
        non_blank(raw).and_then(Zipcode::new),
        "must be a valid postal code",
    )
}

/// Validates an optional [`Frequency`], recording `frequency` if it's
/// unknown.
///
/// `Some(None)` is returned if no [`Frequency`] is provided.
fn frequency(
    v: &mut Validation,
    raw: Option<String>,
) -> Option<Option<Frequency>> {
    match non_blank(raw) {
        None => Some(None),
        Some(f) => v
            .check(
                "frequency",
                f.to_uppercase().parse().ok(),
                "must be one of `ONE_TIME`, `WEEKLY`, `BIWEEKLY` or `MONTHLY`",
            )
            .map(Some),
    }
}

/// Parses a preferred [`Date`], ignoring unparseable ones.
fn preferred_date(raw: Option<String>) -> Option<Date> {
    non_blank(raw).and_then(|d| Date::parse(&d).ok())
}

/// Requests a new `Quotation`, either as a guest or as a customer.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELDS` - the request is malformed;
/// - `FORBIDDEN` - the authenticated `User` cannot request services;
/// - `SERVICE_NOT_OFFERED` - a catalog service is not offered now.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "createQuotation",
        otel.name = api::SPAN_NAME,
        zipcode = ?draft.zipcode,
    ),
)]
pub async fn create(
    ctx: Context,
    Json(draft): Json<Draft>,
) -> Result<(StatusCode, Json<Quotation>), Error> {
    let session = ctx.try_session_that(|c| c.request_services).await?;

    let mut v = Validation::new();
    let requestor = if let Some(s) = &session {
        Some(Requestor::Customer(s.user_id))
    } else {
        let name = draft.contacts.customer_name.clone();
        let name = v.check(
            "customerName",
            non_blank(name).and_then(user::Name::new),
            "is required for guests",
        );
        let contact = match draft.contacts.parse(&mut v) {
            Some(None) => {
                v.reject("contact", "is required for guests");
                None
            }
            c => c.flatten(),
        };
        name.zip(contact)
            .map(|(name, contact)| Requestor::Guest(Guest { name, contact }))
    };
    let selection = draft.services.parse(&mut v);
    let attributes = draft.property.parse(&mut v);
    let zipcode = zipcode(&mut v, draft.zipcode);
    let frequency = frequency(&mut v, draft.frequency);
    let (
        Some(requestor),
        Some(selection),
        Some(attributes),
        Some(zipcode),
        Some(frequency),
    ) = (requestor, selection, attributes, zipcode, frequency)
    else {
        return Err(v.into_error());
    };
    v.finish()?;

    let quotation = ctx
        .service()
        .execute(command::CreateQuotation {
            requestor,
            selection,
            attributes,
            location: Location {
                zipcode,
                address: non_blank(draft.address),
                city: non_blank(draft.city),
            },
            frequency,
            special_requirements: non_blank(draft.special_requirements),
            preferred_date: preferred_date(draft.preferred_date),
            preferred_time: non_blank(draft.preferred_time),
        })
        .await
        .map_err(AsError::into_error)?;

    let vat = ctx.service().config().vat;
    Ok((
        StatusCode::CREATED,
        Json(Quotation::new(quotation, DateTime::now(), vat)),
    ))
}

/// Estimates a job without requesting a `Quotation`.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELDS` - the request is malformed;
/// - `SERVICE_NOT_OFFERED` - a catalog service is not offered now.
#[tracing::instrument(
    skip_all,
    fields(api.name = "estimateQuotation", otel.name = api::SPAN_NAME),
)]
pub async fn estimate(
    ctx: Context,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<Estimate>, Error> {
    let mut v = Validation::new();
    let selection = req.services.parse(&mut v);
    let attributes = req.property.parse(&mut v);
    let (Some(selection), Some(attributes)) = (selection, attributes) else {
        return Err(v.into_error());
    };
    v.finish()?;

    ctx.service()
        .execute(command::EstimateQuotation {
            selection,
            attributes,
        })
        .await
        .map_err(AsError::into_error)
        .map(|o| Json(o.into()))
}

/// Lists `Quotation`s of the authenticated customer, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` cannot request services.
#[tracing::instrument(
    skip_all,
    fields(api.name = "quotations", otel.name = api::SPAN_NAME),
)]
pub async fn list(ctx: Context) -> Result<Json<Vec<Quotation>>, Error> {
    let session = ctx.session_that(|c| c.request_services).await?;

    let quotations = ctx
        .service()
        .execute(query::quotation::ListOwnedBy::by(session.user_id))
        .await
        .map_err(AsError::into_error)?;

    let (now, vat) = (DateTime::now(), ctx.service().config().vat);
    Ok(Json(
        quotations
            .into_iter()
            .map(|q| Quotation::new(q, now, vat))
            .collect(),
    ))
}

/// Lists all the `Quotation`s awaiting a decision, oldest first.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` cannot review quotations.
#[tracing::instrument(
    skip_all,
    fields(api.name = "pendingQuotations", otel.name = api::SPAN_NAME),
)]
pub async fn list_pending(
    ctx: Context,
) -> Result<Json<Vec<Quotation>>, Error> {
    _ = ctx.session_that(|c| c.review_quotations).await?;

    let now = DateTime::now();
    let quotations = ctx
        .service()
        .execute(query::quotation::ListPending::by(
            read::quotation::Pending { at: now },
        ))
        .await
        .map_err(AsError::into_error)?;

    let vat = ctx.service().config().vat;
    Ok(Json(
        quotations
            .into_iter()
            .map(|q| Quotation::new(q, now, vat))
            .collect(),
    ))
}

/// Returns a `Quotation` of the authenticated customer.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `QUOTATION_NOT_EXISTS` - the `Quotation` doesn't exist or is owned by
///                            someone else.
#[tracing::instrument(
    skip_all,
    fields(api.name = "quotation", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn get(
    ctx: Context,
    Path(id): Path<quotation::Id>,
) -> Result<Json<Quotation>, Error> {
    let session = ctx.session_that(|c| c.request_services).await?;

    let quotation = ctx
        .service()
        .execute(query::quotation::OwnedBy::by(read::quotation::OwnedBy {
            id,
            owner_id: session.user_id,
        }))
        .await
        .map_err(AsError::into_error)?
        .ok_or(QuotationError::NotExists)?;

    let vat = ctx.service().config().vat;
    Ok(Json(Quotation::new(quotation, DateTime::now(), vat)))
}

/// Changes a pending `Quotation` and re-estimates it.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELDS` - the patch is malformed;
/// - `INVALID_TOKEN` - the provided token is invalid;
/// - `QUOTATION_NOT_EXISTS` - the `Quotation` doesn't exist or belongs to a
///                            customer other than the authenticated one;
/// - `QUOTATION_EXPIRED` - the `Quotation` is not valid anymore;
/// - `QUOTATION_NOT_PENDING` - the `Quotation` is decided on already;
/// - `NOT_GUEST_QUOTATION` - guest contacts are changed on a customer's
///                           `Quotation`.
#[tracing::instrument(
    skip_all,
    fields(api.name = "updateQuotation", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn update(
    ctx: Context,
    Path(id): Path<quotation::Id>,
    Json(patch): Json<Patch>,
) -> Result<Json<Quotation>, Error> {
    let mut v = Validation::new();
    let patch = patch.parse(&mut v);
    v.finish()?;

    let editor_id = ctx.try_current_session().await?.map(|s| s.user_id);
    let quotation = ctx
        .service()
        .execute(command::UpdateQuotation {
            id,
            editor_id,
            patch,
        })
        .await
        .map_err(AsError::into_error)?;

    let vat = ctx.service().config().vat;
    Ok(Json(Quotation::new(quotation, DateTime::now(), vat)))
}

/// Accepts a pending `Quotation`, assigning a maid to it.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` cannot request services;
/// - `QUOTATION_NOT_EXISTS` - the `Quotation` doesn't exist or is owned by
///                            someone else;
/// - `QUOTATION_EXPIRED` - the `Quotation` is not valid anymore;
/// - `QUOTATION_NOT_PENDING` - the `Quotation` is decided on already;
/// - `MAID_NOT_EXISTS` - the `maidId` doesn't reference any `User`;
/// - `NOT_MAID` - the `maidId` doesn't reference a maid.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "acceptQuotation",
        id = %id,
        maid_id = %acceptance.maid_id,
        otel.name = api::SPAN_NAME,
    ),
)]
pub async fn accept(
    ctx: Context,
    Path(id): Path<quotation::Id>,
    Json(acceptance): Json<Acceptance>,
) -> Result<Json<Quotation>, Error> {
    let session = ctx.session_that(|c| c.request_services).await?;

    let quotation = ctx
        .service()
        .execute(command::AcceptQuotation {
            quotation_id: id,
            customer_id: session.user_id,
            provider_id: acceptance.maid_id,
        })
        .await
        .map_err(AsError::into_error)?;

    let vat = ctx.service().config().vat;
    Ok(Json(Quotation::new(quotation, DateTime::now(), vat)))
}

/// Rejects a pending `Quotation`.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` cannot request services;
/// - `QUOTATION_NOT_EXISTS` - the `Quotation` doesn't exist or is owned by
///                            someone else;
/// - `QUOTATION_EXPIRED` - the `Quotation` is not valid anymore;
/// - `QUOTATION_NOT_PENDING` - the `Quotation` is decided on already.
#[tracing::instrument(
    skip_all,
    fields(api.name = "rejectQuotation", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn reject(
    ctx: Context,
    Path(id): Path<quotation::Id>,
) -> Result<Json<Quotation>, Error> {
    let session = ctx.session_that(|c| c.request_services).await?;

    let quotation = ctx
        .service()
        .execute(command::RejectQuotation {
            quotation_id: id,
            customer_id: session.user_id,
        })
        .await
        .map_err(AsError::into_error)?;

    let vat = ctx.service().config().vat;
    Ok(Json(Quotation::new(quotation, DateTime::now(), vat)))
}

define_error! {
    enum QuotationError {
        #[code = "QUOTATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Quotation` with the provided ID does not exist"]
        NotExists,

        #[code = "QUOTATION_EXPIRED"]
        #[status = CONFLICT]
        #[message = "`Quotation` is not valid anymore"]
        Expired,

        #[code = "QUOTATION_NOT_PENDING"]
        #[status = CONFLICT]
        #[message = "`Quotation` is decided on already"]
        NotPending,
    }
}

impl AsError for quotation::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Expired(_) => QuotationError::Expired.into(),
            Self::NotPending(_) => QuotationError::NotPending.into(),
        })
    }
}

impl AsError for estimate_quotation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "CURRENCY_MISMATCH"]
                #[status = CONFLICT]
                #[message = "Selected services are priced in different \
                             currencies"]
                CurrencyMismatch,

                #[code = "SERVICE_NOT_OFFERED"]
                #[status = NOT_FOUND]
                #[message = "Selected service is not offered in the catalog \
                             now"]
                ServiceNotOffered,
            }
        }

        Some(match self {
            Self::CurrencyMismatch(_) => Error::CurrencyMismatch.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::NoMainService => crate::Error::invalid_fields(vec![Field {
                field: "serviceIds",
                message: "must contain at least one main service".into(),
            }]),
            Self::ServiceNotOffered(_) => Error::ServiceNotOffered.into(),
            Self::WrongCategory { expected, .. } => {
                crate::Error::invalid_fields(vec![Field {
                    field: match expected {
                        catalog::Category::Main => "serviceIds",
                        catalog::Category::Extra => "extraServiceIds",
                    },
                    message: self.to_string(),
                }])
            }
        })
    }
}

impl AsError for command::create_quotation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::Estimation(e) => e.try_as_error(),
        }
    }
}

impl AsError for update_quotation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOT_GUEST_QUOTATION"]
                #[status = CONFLICT]
                #[message = "Guest contacts cannot be changed on a customer's \
                             `Quotation`"]
                NotGuest,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Estimation(e) => return e.try_as_error(),
            Self::NotGuest(_) => Error::NotGuest.into(),
            Self::QuotationNotExists(_) => QuotationError::NotExists.into(),
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::accept_quotation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "MAID_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`User` with the provided `maidId` does not exist"]
                MaidNotExists,

                #[code = "NOT_MAID"]
                #[status = BAD_REQUEST]
                #[message = "`User` with the provided `maidId` does not \
                             provide services"]
                NotMaid,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotProvider(_) => Error::NotMaid.into(),
            Self::ProviderNotExists(_) => Error::MaidNotExists.into(),
            Self::QuotationNotExists(_) => QuotationError::NotExists.into(),
            Self::Transition(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::reject_quotation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::QuotationNotExists(_) => {
                Some(QuotationError::NotExists.into())
            }
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::{pricing, quotation};

    use crate::error::Validation;

    use super::{Draft, EstimateRequest, Patch};

    fn draft(json: &str) -> Draft {
        serde_json::from_str(json).unwrap()
    }

    fn fields(v: Validation) -> Vec<&'static str> {
        v.finish()
            .map_or_else(|e| e.fields.iter().map(|f| f.field).collect(), |()| vec![])
    }

    #[test]
    fn parses_legacy_selection() {
        let req: EstimateRequest = serde_json::from_str(
            r#"{"serviceType":"DEEP_CLEANING","propertyType":"HOUSE",
                "bedrooms":3,"bathrooms":2}"#,
        )
        .unwrap();
        let mut v = Validation::new();

        let selection = req.services.parse(&mut v).unwrap();
        let attrs = req.property.parse(&mut v).unwrap();

        assert!(fields(v).is_empty());
        assert_eq!(
            selection,
            quotation::Selection::Legacy(pricing::ServiceType::DeepCleaning),
        );
        assert_eq!(attrs.property_type, Some(pricing::PropertyType::House));
        assert_eq!(attrs.bedrooms.u32(), 3);
        assert_eq!(attrs.laundry_loads.u32(), 1);
    }

    #[test]
    fn treats_unknown_service_type_as_general_cleaning() {
        let d = draft(r#"{"serviceType":"SPRING_CLEANING"}"#);
        let mut v = Validation::new();

        assert_eq!(
            d.services.parse(&mut v),
            Some(quotation::Selection::Legacy(
                pricing::ServiceType::GeneralCleaning,
            )),
        );
    }

    #[test]
    fn refuses_mixed_selection() {
        let d = draft(
            r#"{"serviceType":"DEEP_CLEANING",
                "serviceIds":["6a2f41a3-c54c-fce8-32d2-0324e1c32e22"],
                "cityCode":"NYC","tenantId":1}"#,
        );
        let mut v = Validation::new();

        assert!(d.services.parse(&mut v).is_none());
        assert_eq!(fields(v), ["serviceType"]);
    }

    #[test]
    fn requires_catalog_scope() {
        let d = draft(r#"{"serviceIds":[]}"#);
        let mut v = Validation::new();

        assert!(d.services.parse(&mut v).is_none());
        assert_eq!(fields(v), ["serviceIds", "cityCode", "tenantId"]);
    }

    #[test]
    fn refuses_non_positive_counts() {
        let d = draft(r#"{"bedrooms":0,"bathrooms":-1,"squareFootage":" "}"#);
        let mut v = Validation::new();

        assert!(d.property.parse(&mut v).is_none());
        assert_eq!(fields(v), ["bedrooms", "bathrooms"]);
    }

    #[test]
    fn classifies_guest_contact() {
        let d = draft(r#"{"contact":"+1 (555) 010-9999"}"#);
        let mut v = Validation::new();

        let contact = d.contacts.parse(&mut v).flatten().unwrap();

        assert_eq!(contact.phone().map(AsRef::as_ref), Some("+15550109999"));
    }

    #[test]
    fn refuses_ambiguous_guest_contacts() {
        let d = draft(
            r#"{"customerEmail":"jane@example.com","customerPhone":"5550101"}"#,
        );
        let mut v = Validation::new();

        assert!(d.contacts.parse(&mut v).is_none());
        assert_eq!(fields(v), ["contact"]);
    }

    #[test]
    fn patches_only_provided_fields() {
        let p: Patch = serde_json::from_str(
            r#"{"bedrooms":4,"city":null,"preferredDate":"someday",
                "frequency":"weekly"}"#,
        )
        .unwrap();
        let mut v = Validation::new();

        let patch = p.parse(&mut v);

        assert!(fields(v).is_empty());
        assert!(patch.selection.is_none());
        assert_eq!(patch.bedrooms.map(pricing::Count::u32), Some(4));
        assert_eq!(patch.bathrooms, None);
        assert_eq!(patch.city, Some(None));
        assert_eq!(patch.address, None);
        assert_eq!(patch.preferred_date, Some(None));
        assert_eq!(patch.frequency, Some(Some(quotation::Frequency::Weekly)));
    }

    #[test]
    fn refuses_unknown_patch_fields() {
        let res = serde_json::from_str::<Patch>(r#"{"status":"ACCEPTED"}"#);

        assert!(res.is_err());
    }

    #[test]
    fn refuses_unknown_frequency() {
        let p: Patch =
            serde_json::from_str(r#"{"frequency":"DAILY"}"#).unwrap();
        let mut v = Validation::new();

        _ = p.parse(&mut v);

        assert_eq!(fields(v), ["frequency"]);
    }
}
