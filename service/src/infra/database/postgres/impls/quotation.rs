//! [`Quotation`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Date, Minutes,
};
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        catalog,
        pricing::{self, Count, PropertyType, ServiceType, SquareFootage},
        quotation::{
            self, Contact, Frequency, Guest, Location, Requestor, Selection,
            Status, Zipcode,
        },
        user, Quotation,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

use super::{money, money_columns};

/// Columns of the `quotations` table.
const COLUMNS: &str = "\
    id, customer_id, customer_name, customer_email, customer_phone, \
    service_type, city_code, tenant_id, main_service_ids, extra_service_ids, \
    property_type, bedrooms, bathrooms, square_footage, laundry_loads, \
    zipcode, address, city, frequency, \
    estimated_duration, estimated_price_amount, estimated_price_currency, \
    special_requirements, preferred_date, preferred_time, \
    status, provider_id, valid_until, created_at, updated_at";

/// Placeholders of the [`COLUMNS`], in the same order.
const VALUES: &str = "\
    $1::UUID, $2::UUID, $3::VARCHAR, $4::VARCHAR, $5::VARCHAR, \
    $6::INT2, $7::VARCHAR, $8::INT4, $9::UUID[], $10::UUID[], \
    $11::INT2, $12::INT2, $13::INT2, $14::VARCHAR, $15::INT2, \
    $16::VARCHAR, $17::VARCHAR, $18::VARCHAR, $19::INT2, \
    $20::INT4, $21::NUMERIC, $22::INT2, \
    $23::TEXT, $24::DATE, $25::VARCHAR, \
    $26::INT2, $27::UUID, $28::TIMESTAMPTZ, $29::TIMESTAMPTZ, $30::TIMESTAMPTZ";

/// [`Quotation`] split into the `quotations` table columns.
struct Columns {
    id: quotation::Id,
    customer_id: Option<user::Id>,
    customer_name: Option<user::Name>,
    customer_email: Option<user::Email>,
    customer_phone: Option<user::Phone>,
    service_type: Option<ServiceType>,
    city_code: Option<catalog::CityCode>,
    tenant_id: Option<catalog::TenantId>,
    main_service_ids: Vec<catalog::Id>,
    extra_service_ids: Vec<catalog::Id>,
    property_type: Option<PropertyType>,
    bedrooms: Count,
    bathrooms: Count,
    square_footage: Option<SquareFootage>,
    laundry_loads: Count,
    zipcode: Zipcode,
    address: Option<String>,
    city: Option<String>,
    frequency: Option<Frequency>,
    estimated_duration: Minutes,
    estimated_price_amount: Option<Decimal>,
    estimated_price_currency: Option<common::money::Currency>,
    special_requirements: Option<String>,
    preferred_date: Option<Date>,
    preferred_time: Option<String>,
    status: Status,
    provider_id: Option<user::Id>,
    valid_until: quotation::ExpirationDateTime,
    created_at: quotation::CreationDateTime,
    updated_at: quotation::ModificationDateTime,
}

impl From<Quotation> for Columns {
    fn from(q: Quotation) -> Self {
        let Quotation {
            id,
            requestor,
            selection,
            attributes:
                pricing::Attributes {
                    property_type,
                    bedrooms,
                    bathrooms,
                    square_footage,
                    laundry_loads,
                },
            location: Location {
                zipcode,
                address,
                city,
            },
            frequency,
            estimated_duration,
            estimated_price,
            special_requirements,
            preferred_date,
            preferred_time,
            status,
            provider_id,
            valid_until,
            created_at,
            updated_at,
        } = q;

        let (customer_id, customer_name, customer_email, customer_phone) =
            match requestor {
                Requestor::Customer(id) => (Some(id), None, None, None),
                Requestor::Guest(Guest { name, contact }) => match contact {
                    Contact::Email(e) => (None, Some(name), Some(e), None),
                    Contact::Phone(p) => (None, Some(name), None, Some(p)),
                },
            };
        let (service_type, city_code, tenant_id, main, extras) = match selection
        {
            Selection::Legacy(ty) => (Some(ty), None, None, vec![], vec![]),
            Selection::Catalog {
                scope,
                main,
                extras,
            } => (
                None,
                Some(scope.city_code),
                Some(scope.tenant_id),
                main,
                extras,
            ),
        };
        let (estimated_price_amount, estimated_price_currency) =
            money_columns(estimated_price);

        Self {
            id,
            customer_id,
            customer_name,
            customer_email,
            customer_phone,
            service_type,
            city_code,
            tenant_id,
            main_service_ids: main,
            extra_service_ids: extras,
            property_type,
            bedrooms,
            bathrooms,
            square_footage,
            laundry_loads,
            zipcode,
            address,
            city,
            frequency,
            estimated_duration,
            estimated_price_amount,
            estimated_price_currency,
            special_requirements,
            preferred_date,
            preferred_time,
            status,
            provider_id,
            valid_until,
            created_at,
            updated_at,
        }
    }
}

impl Columns {
    /// Returns SQL parameters matching the [`VALUES`] placeholders.
    fn params(&self) -> [&(dyn ToSql + Sync); 30] {
        [
            &self.id,
            &self.customer_id,
            &self.customer_name,
            &self.customer_email,
            &self.customer_phone,
            &self.service_type,
            &self.city_code,
            &self.tenant_id,
            &self.main_service_ids,
            &self.extra_service_ids,
            &self.property_type,
            &self.bedrooms,
            &self.bathrooms,
            &self.square_footage,
            &self.laundry_loads,
            &self.zipcode,
            &self.address,
            &self.city,
            &self.frequency,
            &self.estimated_duration,
            &self.estimated_price_amount,
            &self.estimated_price_currency,
            &self.special_requirements,
            &self.preferred_date,
            &self.preferred_time,
            &self.status,
            &self.provider_id,
            &self.valid_until,
            &self.created_at,
            &self.updated_at,
        ]
    }
}

/// Reads a [`Quotation`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Result<Quotation, Traced<database::Error>> {
    use database::Error as E;

    let requestor = match row.get::<_, Option<user::Id>>("customer_id") {
        Some(id) => Requestor::Customer(id),
        None => {
            let name: Option<user::Name> = row.get("customer_name");
            let email: Option<user::Email> = row.get("customer_email");
            let phone: Option<user::Phone> = row.get("customer_phone");
            let contact = email
                .map(Contact::Email)
                .or_else(|| phone.map(Contact::Phone));
            match (name, contact) {
                (Some(name), Some(contact)) => {
                    Requestor::Guest(Guest { name, contact })
                }
                (None, _) | (_, None) => {
                    return Err(tracerr::new!(E::Corrupted(
                        "`quotations` requestor",
                    )));
                }
            }
        }
    };

    let selection = match row.get::<_, Option<ServiceType>>("service_type") {
        Some(ty) => Selection::Legacy(ty),
        None => {
            let city_code: Option<catalog::CityCode> = row.get("city_code");
            let tenant_id: Option<catalog::TenantId> = row.get("tenant_id");
            let (Some(city_code), Some(tenant_id)) = (city_code, tenant_id)
            else {
                return Err(tracerr::new!(E::Corrupted(
                    "`quotations` selection",
                )));
            };
            Selection::Catalog {
                scope: catalog::Scope {
                    city_code,
                    tenant_id,
                },
                main: row.get("main_service_ids"),
                extras: row.get("extra_service_ids"),
            }
        }
    };

    Ok(Quotation {
        id: row.get("id"),
        requestor,
        selection,
        attributes: pricing::Attributes {
            property_type: row.get("property_type"),
            bedrooms: row.get("bedrooms"),
            bathrooms: row.get("bathrooms"),
            square_footage: row.get("square_footage"),
            laundry_loads: row.get("laundry_loads"),
        },
        location: Location {
            zipcode: row.get("zipcode"),
            address: row.get("address"),
            city: row.get("city"),
        },
        frequency: row.get("frequency"),
        estimated_duration: row.get("estimated_duration"),
        estimated_price: money(row, "estimated_price"),
        special_requirements: row.get("special_requirements"),
        preferred_date: row.get("preferred_date"),
        preferred_time: row.get("preferred_time"),
        status: row.get("status"),
        provider_id: row.get("provider_id"),
        valid_until: row.get("valid_until"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl<C> Database<Select<By<Option<Quotation>, quotation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Quotation>, quotation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM quotations \
             WHERE id = $1::UUID",
        );
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Option<Quotation>, read::quotation::OwnedBy>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Quotation>, read::quotation::OwnedBy>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::quotation::OwnedBy { id, owner_id } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM quotations \
             WHERE id = $1::UUID \
               AND customer_id = $2::UUID",
        );
        self.query_opt(&sql, &[&id, &owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Quotation>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Quotation>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let owner_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM quotations \
             WHERE customer_id = $1::UUID \
             ORDER BY created_at DESC, id",
        );
        self.query(&sql, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Select<By<Vec<Quotation>, read::quotation::Pending>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Quotation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Quotation>, read::quotation::Pending>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::quotation::Pending { at } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM quotations \
             WHERE status = $1::INT2 \
               AND valid_until >= $2::TIMESTAMPTZ \
             ORDER BY created_at, id",
        );
        self.query(&sql, &[&Status::Pending, &at])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Insert<Quotation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(quotation): Insert<Quotation>,
    ) -> Result<Self::Ok, Self::Err> {
        let columns = Columns::from(quotation);

        let sql = format!("INSERT INTO quotations ({COLUMNS}) VALUES ({VALUES})");
        self.exec(&sql, &columns.params())
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Quotation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(quotation): Update<Quotation>,
    ) -> Result<Self::Ok, Self::Err> {
        let columns = Columns::from(quotation);

        // `id` and `created_at` are immutable.
        let sql = format!(
            "UPDATE quotations \
             SET ({COLUMNS}) = ({VALUES}) \
             WHERE id = $1::UUID \
               AND created_at = $29::TIMESTAMPTZ",
        );
        self.exec(&sql, &columns.params())
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Quotation, quotation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Quotation, quotation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: quotation::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM quotations \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
