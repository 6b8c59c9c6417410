//! Service catalog [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::catalog,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

use super::money;

/// Columns of the `service_catalog` table.
const COLUMNS: &str = "\
    id, name, category, price_model, rate_amount, rate_currency, \
    unit, description, icon, season_start, season_end, city_code, tenant_id";

/// Reads a [`catalog::Entry`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Result<catalog::Entry, Traced<database::Error>> {
    Ok(catalog::Entry {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        price_model: row.get("price_model"),
        rate: money(row, "rate").ok_or_else(|| {
            tracerr::new!(database::Error::Corrupted("`service_catalog.rate`"))
        })?,
        unit: row.get("unit"),
        description: row.get("description"),
        icon: row.get("icon"),
        season_start: row.get("season_start"),
        season_end: row.get("season_end"),
        city_code: row.get("city_code"),
        tenant_id: row.get("tenant_id"),
    })
}

impl<C, IDs> Database<Select<By<HashMap<catalog::Id, catalog::Entry>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[catalog::Id]>,
{
    type Ok = HashMap<catalog::Id, catalog::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<catalog::Id, catalog::Entry>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let ids: &[catalog::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_catalog \
             WHERE id = ANY($1::UUID[])",
        );
        self.query(&sql, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| from_row(row).map(|e| (e.id, e)))
            .collect()
    }
}

impl<C> Database<Select<By<Vec<catalog::Entry>, read::catalog::Offered>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<catalog::Entry>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<catalog::Entry>, read::catalog::Offered>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::catalog::Offered {
            scope: catalog::Scope {
                city_code,
                tenant_id,
            },
            on,
        } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_catalog \
             WHERE city_code = $1::VARCHAR \
               AND tenant_id = $2::INT4 \
               AND season_start <= $3::DATE \
               AND season_end >= $3::DATE \
             ORDER BY category, name",
        );
        self.query(&sql, &[&city_code, &tenant_id, &on])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}
