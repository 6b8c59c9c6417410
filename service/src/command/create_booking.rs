//! [`Command`] for booking a cleaning job.

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Minutes,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        booking::{self, Financials, Schedule, ScheduleError},
        quotation, user, Booking, Quotation, User,
    },
    infra::{database, Database},
    read,
    Service,
};

use super::Command;

/// [`Command`] for booking a cleaning job with a provider.
#[derive(Clone, Debug)]
pub struct CreateBooking {
    /// ID of the client booking the job.
    pub client_id: user::Id,

    /// ID of the provider to do the job.
    pub provider_id: user::Id,

    /// ID of the accepted [`Quotation`] the job is booked from, if any.
    pub quotation_id: Option<quotation::Id>,

    /// [`DateTime`] when the job starts.
    pub start_time: booking::StartDateTime,

    /// [`DateTime`] when the job ends.
    ///
    /// Derived from the `duration` if omitted.
    pub end_time: Option<booking::EndDateTime>,

    /// Duration of the job.
    ///
    /// Must match the `end_time`, if both are provided.
    pub duration: Option<Minutes>,

    /// Free-form instructions for the provider.
    pub special_instructions: Option<String>,

    /// Whether the job repeats.
    pub is_recurring: bool,

    /// Description of how the job repeats.
    pub recurrence_pattern: Option<serde_json::Value>,
}

impl<Db> Command<CreateBooking> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Quotation>, read::quotation::OwnedBy>>,
            Ok = Option<Quotation>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Booking;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateBooking) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateBooking {
            client_id,
            provider_id,
            quotation_id,
            start_time,
            end_time,
            duration,
            special_instructions,
            is_recurring,
            recurrence_pattern,
        } = cmd;

        let client = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(client_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.deleted_at.is_none())
            .ok_or(E::UserNotExists(client_id))
            .map_err(tracerr::wrap!())?;
        if !client.role.capabilities().request_services {
            return Err(tracerr::new!(E::NotClient(client_id)));
        }

        let provider = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(provider_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.deleted_at.is_none())
            .ok_or(E::UserNotExists(provider_id))
            .map_err(tracerr::wrap!())?;
        if !provider.role.capabilities().provide_services {
            return Err(tracerr::new!(E::NotProvider(provider_id)));
        }
        let hourly_rate = provider
            .hourly_rate
            .ok_or(E::NoHourlyRate(provider_id))
            .map_err(tracerr::wrap!())?;

        let now = DateTime::now();
        if let Some(id) = quotation_id {
            let quotation = self
                .database()
                .execute(Select(By::new(read::quotation::OwnedBy {
                    id,
                    owner_id: client_id,
                })))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::QuotationNotExists(id))
                .map_err(tracerr::wrap!())?;
            let status = quotation.status_at(now);
            if status != quotation::Status::Accepted {
                return Err(tracerr::new!(E::QuotationNotAccepted(status)));
            }
            if quotation.provider_id != Some(provider_id) {
                return Err(tracerr::new!(E::ProviderMismatch(provider_id)));
            }
        }

        let schedule = match (end_time, duration) {
            (Some(end_time), duration) => {
                let schedule = Schedule::new(start_time, end_time)
                    .map_err(tracerr::from_and_wrap!(=> E))?;
                if let Some(d) = duration.filter(|d| *d != schedule.duration) {
                    return Err(tracerr::new!(E::DurationMismatch {
                        requested: d,
                        scheduled: schedule.duration,
                    }));
                }
                schedule
            }
            (None, Some(duration)) => Schedule::starting_at(start_time, duration)
                .map_err(tracerr::from_and_wrap!(=> E))?,
            (None, None) => return Err(tracerr::new!(E::ScheduleIncomplete)),
        };

        let booking = Booking {
            id: booking::Id::new(),
            client_id,
            provider_id,
            quotation_id,
            schedule,
            financials: Financials::compute(
                hourly_rate,
                schedule.duration,
                self.config().platform_fee,
            ),
            status: booking::Status::Pending,
            special_instructions,
            is_recurring,
            recurrence_pattern,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(booking.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            booking_id = %booking.id,
            %client_id,
            %provider_id,
            total = %booking.financials.total_amount,
            "booking created",
        );

        Ok(booking)
    }
}

/// Error of [`CreateBooking`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Requested duration doesn't match the scheduled time slot.
    #[display(
        "Duration of {requested} minutes doesn't match the {scheduled} \
         minutes between `startTime` and `endTime`"
    )]
    DurationMismatch {
        /// Requested duration.
        #[error(not(source))]
        requested: Minutes,

        /// Duration between the start and the end of the job.
        scheduled: Minutes,
    },

    /// Provider [`User`] has no hourly rate.
    #[display("`User(id: {_0})` has no hourly rate")]
    NoHourlyRate(#[error(not(source))] user::Id),

    /// [`User`] booking the job cannot request services.
    #[display("`User(id: {_0})` cannot book services")]
    NotClient(#[error(not(source))] user::Id),

    /// [`User`] booked for the job cannot provide services.
    #[display("`User(id: {_0})` is not a service provider")]
    NotProvider(#[error(not(source))] user::Id),

    /// Provider differs from the one assigned to the [`Quotation`].
    #[display("`User(id: {_0})` is not assigned to the `Quotation`")]
    ProviderMismatch(#[error(not(source))] user::Id),

    /// [`Quotation`] is not accepted.
    #[display("`Quotation` is {_0}, not ACCEPTED")]
    QuotationNotAccepted(#[error(not(source))] quotation::Status),

    /// [`Quotation`] doesn't exist or belongs to another customer.
    #[display("`Quotation(id: {_0})` does not exist")]
    QuotationNotExists(#[error(not(source))] quotation::Id),

    /// Time slot of the job is invalid.
    #[display("{_0}")]
    #[from]
    Schedule(ScheduleError),

    /// Neither the end nor the duration of the job is provided.
    #[display("Either `endTime` or `duration` must be provided")]
    ScheduleIncomplete,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
