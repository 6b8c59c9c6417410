//! [`Booking`]-related [`Database`] implementations.

use common::{
    money::Currency,
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        booking::{self, Financials, Schedule},
        user, Booking,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `bookings` table.
const COLUMNS: &str = "\
    id, client_id, provider_id, quotation_id, \
    start_time, end_time, duration, \
    currency, total_amount, platform_fee, provider_earnings, \
    status, special_instructions, is_recurring, recurrence_pattern, \
    cancellation_reason, cancelled_at, created_at, updated_at";

/// Placeholders of the [`COLUMNS`], in the same order.
const VALUES: &str = "\
    $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
    $5::TIMESTAMPTZ, $6::TIMESTAMPTZ, $7::INT4, \
    $8::INT2, $9::NUMERIC, $10::NUMERIC, $11::NUMERIC, \
    $12::INT2, $13::TEXT, $14::BOOL, $15::JSONB, \
    $16::TEXT, $17::TIMESTAMPTZ, $18::TIMESTAMPTZ, $19::TIMESTAMPTZ";

/// Reads a [`Booking`] from the provided [`Row`] of [`COLUMNS`].
fn from_row(row: &Row) -> Booking {
    let currency: Currency = row.get("currency");
    let money = |column: &str| Money {
        amount: row.get::<_, Decimal>(column),
        currency,
    };

    Booking {
        id: row.get("id"),
        client_id: row.get("client_id"),
        provider_id: row.get("provider_id"),
        quotation_id: row.get("quotation_id"),
        schedule: Schedule {
            start_time: row.get("start_time"),
            end_time: row.get("end_time"),
            duration: row.get("duration"),
        },
        financials: Financials {
            total_amount: money("total_amount"),
            platform_fee: money("platform_fee"),
            provider_earnings: money("provider_earnings"),
        },
        status: row.get("status"),
        special_instructions: row.get("special_instructions"),
        is_recurring: row.get("is_recurring"),
        recurrence_pattern: row.get("recurrence_pattern"),
        cancellation_reason: row.get("cancellation_reason"),
        cancelled_at: row.get("cancelled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Writes the provided [`Booking`] with the provided SQL statement taking
/// [`VALUES`] as parameters.
async fn write<C: Connection>(
    conn: &Postgres<C>,
    sql: &str,
    booking: &Booking,
) -> Result<(), Traced<database::Error>> {
    let Booking {
        id,
        client_id,
        provider_id,
        quotation_id,
        schedule:
            Schedule {
                start_time,
                end_time,
                duration,
            },
        financials:
            Financials {
                total_amount,
                platform_fee,
                provider_earnings,
            },
        status,
        special_instructions,
        is_recurring,
        recurrence_pattern,
        cancellation_reason,
        cancelled_at,
        created_at,
        updated_at,
    } = booking;

    let params: [&(dyn ToSql + Sync); 19] = [
        id,
        client_id,
        provider_id,
        quotation_id,
        start_time,
        end_time,
        duration,
        &total_amount.currency,
        &total_amount.amount,
        &platform_fee.amount,
        &provider_earnings.amount,
        status,
        special_instructions,
        is_recurring,
        recurrence_pattern,
        cancellation_reason,
        cancelled_at,
        created_at,
        updated_at,
    ];
    conn.exec(sql, &params)
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
}

impl<C> Database<Select<By<Option<Booking>, read::booking::Involving>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, read::booking::Involving>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::Involving { id, user_id } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE id = $1::UUID \
               AND (client_id = $2::UUID OR provider_id = $2::UUID)",
        );
        Ok(self
            .query_opt(&sql, &[&id, &user_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Booking>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE client_id = $1::UUID OR provider_id = $1::UUID \
             ORDER BY start_time DESC, id",
        );
        Ok(self
            .query(&sql, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!("INSERT INTO bookings ({COLUMNS}) VALUES ({VALUES})");
        write(self, &sql, &booking).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking): Update<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        // Parties, schedule and financials never change.
        let sql = "\
            UPDATE bookings \
            SET status = $12::INT2, \
                special_instructions = $13::TEXT, \
                is_recurring = $14::BOOL, \
                recurrence_pattern = $15::JSONB, \
                cancellation_reason = $16::TEXT, \
                cancelled_at = $17::TIMESTAMPTZ, \
                updated_at = $19::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND client_id = $2::UUID \
              AND provider_id = $3::UUID \
              AND quotation_id IS NOT DISTINCT FROM $4::UUID \
              AND start_time = $5::TIMESTAMPTZ \
              AND end_time = $6::TIMESTAMPTZ \
              AND duration = $7::INT4 \
              AND currency = $8::INT2 \
              AND total_amount = $9::NUMERIC \
              AND platform_fee = $10::NUMERIC \
              AND provider_earnings = $11::NUMERIC \
              AND created_at = $18::TIMESTAMPTZ";
        write(self, sql, &booking).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Lock<By<Booking, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM bookings \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
