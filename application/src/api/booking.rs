//! [`Booking`]-related definitions.

use axum::http::StatusCode;
use common::{DateTime, Minutes, Money};
use serde::{Deserialize, Serialize};
use service::{
    command::{self, cancel_booking, create_booking, update_booking_status},
    domain::{self, booking, quotation, user},
    query, read, Command as _,
};

use crate::{
    api::{self, non_blank, Json, Path},
    define_error,
    error::{Field, Validation},
    AsError, Context, Error,
};

/// Scheduled cleaning job.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Unique identifier of this `Booking`.
    pub id: booking::Id,

    /// Client who booked the job.
    pub client_id: user::Id,

    /// Maid doing the job.
    pub maid_id: user::Id,

    /// `Quotation` the job is booked from.
    pub quotation_id: Option<quotation::Id>,

    /// When the job starts.
    pub start_time: DateTime,

    /// When the job ends.
    pub end_time: DateTime,

    /// Duration of the job, in minutes.
    pub duration: Minutes,

    /// Amount paid by the client.
    pub total_amount: Money,

    /// Part of the `total_amount` kept by the platform.
    pub platform_fee: Money,

    /// Part of the `total_amount` paid to the maid.
    pub maid_earnings: Money,

    /// Current status.
    pub status: booking::Status,

    /// Free-form instructions for the maid.
    pub special_instructions: Option<String>,

    /// Whether the job repeats.
    pub is_recurring: bool,

    /// How the job repeats.
    pub recurrence_pattern: Option<serde_json::Value>,

    /// Why the job was cancelled.
    pub cancellation_reason: Option<String>,

    /// When the job was cancelled.
    pub cancelled_at: Option<DateTime>,

    /// When this `Booking` was created.
    pub created_at: DateTime,

    /// When this `Booking` was last changed.
    pub updated_at: DateTime,
}

impl From<domain::Booking> for Booking {
    fn from(b: domain::Booking) -> Self {
        Self {
            id: b.id,
            client_id: b.client_id,
            maid_id: b.provider_id,
            quotation_id: b.quotation_id,
            start_time: b.schedule.start_time.coerce(),
            end_time: b.schedule.end_time.coerce(),
            duration: b.schedule.duration,
            total_amount: b.financials.total_amount,
            platform_fee: b.financials.platform_fee,
            maid_earnings: b.financials.provider_earnings,
            status: b.status,
            special_instructions: b.special_instructions,
            is_recurring: b.is_recurring,
            recurrence_pattern: b.recurrence_pattern,
            cancellation_reason: b.cancellation_reason.map(|r| r.to_string()),
            cancelled_at: b.cancelled_at.map(|t| t.coerce()),
            created_at: b.created_at.coerce(),
            updated_at: b.updated_at.coerce(),
        }
    }
}

/// Request of a new `Booking`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Maid to do the job.
    #[serde(alias = "providerId")]
    maid_id: user::Id,

    /// Accepted `Quotation` the job is booked from.
    quotation_id: Option<quotation::Id>,

    /// When the job starts, in RFC 3339.
    start_time: String,

    /// When the job ends, in RFC 3339.
    end_time: Option<String>,

    /// Duration of the job, in minutes.
    duration: Option<i64>,

    /// Free-form instructions for the maid.
    special_instructions: Option<String>,

    /// Whether the job repeats.
    #[serde(default)]
    is_recurring: bool,

    /// How the job repeats.
    #[serde(alias = "recurringPattern")]
    recurrence_pattern: Option<serde_json::Value>,
}

/// Requested change of a `Booking` status.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    /// Status to move the `Booking` into.
    status: String,
}

/// Request to cancel a `Booking`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    /// Why the `Booking` is cancelled.
    cancellation_reason: Option<String>,
}

/// Books a job with a maid.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` cannot book services;
/// - `INVALID_FIELDS` - the time slot is malformed;
/// - `MAID_NOT_EXISTS` - the `maidId` doesn't reference any `User`;
/// - `NOT_MAID` - the `maidId` doesn't reference a maid;
/// - `NO_HOURLY_RATE` - the maid has no hourly rate;
/// - `QUOTATION_NOT_EXISTS` - the `Quotation` doesn't exist or is owned by
///                            someone else;
/// - `QUOTATION_NOT_ACCEPTED` - the `Quotation` is not accepted;
/// - `MAID_MISMATCH` - the maid is not the one assigned to the `Quotation`.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "createBooking",
        maid_id = %draft.maid_id,
        otel.name = api::SPAN_NAME,
        quotation_id = ?draft.quotation_id,
    ),
)]
pub async fn create(
    ctx: Context,
    Json(draft): Json<Draft>,
) -> Result<(StatusCode, Json<Booking>), Error> {
    let session = ctx.session_that(|c| c.request_services).await?;

    let mut v = Validation::new();
    let start_time = v.check(
        "startTime",
        booking::StartDateTime::from_rfc3339(&draft.start_time).ok(),
        "must be an RFC 3339 date and time",
    );
    let end_time = non_blank(draft.end_time).map(|t| {
        v.check(
            "endTime",
            booking::EndDateTime::from_rfc3339(&t).ok(),
            "must be an RFC 3339 date and time",
        )
    });
    let duration = draft.duration.map(|d| {
        v.check(
            "duration",
            u32::try_from(d).ok().filter(|d| *d > 0).map(Minutes::new),
            "must be a positive number of minutes",
        )
    });
    let Some(start_time) = start_time else {
        return Err(v.into_error());
    };
    v.finish()?;

    let booking = ctx
        .service()
        .execute(command::CreateBooking {
            client_id: session.user_id,
            provider_id: draft.maid_id,
            quotation_id: draft.quotation_id,
            start_time,
            end_time: end_time.flatten(),
            duration: duration.flatten(),
            special_instructions: non_blank(draft.special_instructions),
            is_recurring: draft.is_recurring,
            recurrence_pattern: draft
                .recurrence_pattern
                .filter(|p| !p.is_null()),
        })
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Lists `Booking`s the authenticated `User` takes part in, soonest first.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated.
#[tracing::instrument(
    skip_all,
    fields(api.name = "bookings", otel.name = api::SPAN_NAME),
)]
pub async fn list(ctx: Context) -> Result<Json<Vec<Booking>>, Error> {
    let session = ctx.current_session().await?;

    ctx.service()
        .execute(query::booking::ListInvolving::by(session.user_id))
        .await
        .map_err(AsError::into_error)
        .map(|bs| Json(bs.into_iter().map(Into::into).collect()))
}

/// Returns a `Booking` the authenticated `User` takes part in.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `BOOKING_NOT_EXISTS` - the `Booking` doesn't exist or the `User` takes
///                          no part in it.
#[tracing::instrument(
    skip_all,
    fields(api.name = "booking", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn get(
    ctx: Context,
    Path(id): Path<booking::Id>,
) -> Result<Json<Booking>, Error> {
    let session = ctx.current_session().await?;

    ctx.service()
        .execute(query::booking::Involving::by(read::booking::Involving {
            id,
            user_id: session.user_id,
        }))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| BookingError::NotExists.into())
        .map(|b| Json(b.into()))
}

/// Moves a `Booking` along its lifecycle.
///
/// Cancellation goes through [`cancel()`] instead, as it requires a reason.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `INVALID_FIELDS` - the status is unknown or `CANCELLED`;
/// - `BOOKING_NOT_EXISTS` - the `Booking` doesn't exist or the `User` takes
///                          no part in it;
/// - `TRANSITION_NOT_ALLOWED` - the `Booking` cannot move into the status;
/// - `TRANSITION_FORBIDDEN` - the `User` cannot move the `Booking` into the
///                            status.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "updateBookingStatus",
        id = %id,
        otel.name = api::SPAN_NAME,
        status = %change.status,
    ),
)]
pub async fn update_status(
    ctx: Context,
    Path(id): Path<booking::Id>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Booking>, Error> {
    let session = ctx.current_session().await?;

    let mut v = Validation::new();
    let status = match change.status.trim().to_uppercase().parse() {
        Ok(booking::Status::Cancelled) => {
            v.reject(
                "status",
                "use `POST /api/bookings/{id}/cancel` with a \
                 `cancellationReason` instead",
            );
            None
        }
        Ok(s) => Some(s),
        Err(_) => {
            v.reject("status", "must be a known `Booking` status");
            None
        }
    };
    let Some(status) = status else {
        return Err(v.into_error());
    };

    ctx.service()
        .execute(command::UpdateBookingStatus {
            booking_id: id,
            actor_id: session.user_id,
            status,
        })
        .await
        .map_err(AsError::into_error)
        .map(|b| Json(b.into()))
}

/// Cancels a `Booking` for the provided reason.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `INVALID_FIELDS` - the reason is blank;
/// - `BOOKING_NOT_EXISTS` - the `Booking` doesn't exist or the `User` takes
///                          no part in it;
/// - `TRANSITION_NOT_ALLOWED` - the `Booking` cannot be cancelled anymore.
#[tracing::instrument(
    skip_all,
    fields(api.name = "cancelBooking", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn cancel(
    ctx: Context,
    Path(id): Path<booking::Id>,
    Json(cancellation): Json<Cancellation>,
) -> Result<Json<Booking>, Error> {
    let session = ctx.current_session().await?;

    let mut v = Validation::new();
    let Some(reason) = v.check(
        "cancellationReason",
        cancellation
            .cancellation_reason
            .and_then(booking::CancellationReason::new),
        "is required",
    ) else {
        return Err(v.into_error());
    };

    ctx.service()
        .execute(command::CancelBooking {
            booking_id: id,
            actor_id: session.user_id,
            reason,
        })
        .await
        .map_err(AsError::into_error)
        .map(|b| Json(b.into()))
}

define_error! {
    enum BookingError {
        #[code = "BOOKING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Booking` with the provided ID does not exist"]
        NotExists,
    }
}

impl AsError for booking::TransitionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::NotAllowed { .. } => Error::new(
                "TRANSITION_NOT_ALLOWED",
                StatusCode::CONFLICT,
                self,
            ),
            Self::Forbidden { .. } => Error::new(
                "TRANSITION_FORBIDDEN",
                StatusCode::FORBIDDEN,
                self,
            ),
            Self::ReasonRequired => Error::invalid_fields(vec![Field {
                field: "cancellationReason",
                message: self.to_string(),
            }]),
        })
    }
}

impl AsError for create_booking::ExecutionError {
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

                #[code = "NO_HOURLY_RATE"]
                #[status = CONFLICT]
                #[message = "Maid has no hourly rate to price the job with"]
                NoHourlyRate,

                #[code = "FORBIDDEN"]
                #[status = FORBIDDEN]
                #[message = "Authenticated `User` is not allowed to do this"]
                NotClient,

                #[code = "MAID_MISMATCH"]
                #[status = CONFLICT]
                #[message = "Maid is not the one assigned to the `Quotation`"]
                MaidMismatch,

                #[code = "QUOTATION_NOT_ACCEPTED"]
                #[status = CONFLICT]
                #[message = "`Quotation` must be accepted to be booked"]
                QuotationNotAccepted,

                #[code = "QUOTATION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Quotation` with the provided ID does not exist"]
                QuotationNotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::DurationMismatch { .. } => {
                crate::Error::invalid_fields(vec![Field {
                    field: "duration",
                    message: self.to_string(),
                }])
            }
            Self::NoHourlyRate(_) => Error::NoHourlyRate.into(),
            Self::NotClient(_) => Error::NotClient.into(),
            Self::NotProvider(_) => Error::NotMaid.into(),
            Self::ProviderMismatch(_) => Error::MaidMismatch.into(),
            Self::QuotationNotAccepted(_) => Error::QuotationNotAccepted.into(),
            Self::QuotationNotExists(_) => Error::QuotationNotExists.into(),
            Self::Schedule(e) => crate::Error::invalid_fields(vec![Field {
                field: "endTime",
                message: e.to_string(),
            }]),
            Self::ScheduleIncomplete => {
                crate::Error::invalid_fields(vec![Field {
                    field: "duration",
                    message: self.to_string(),
                }])
            }
            Self::UserNotExists(_) => Error::MaidNotExists.into(),
        })
    }
}

impl AsError for update_booking_status::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

impl AsError for cancel_booking::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::BookingNotExists(_) => Some(BookingError::NotExists.into()),
            Self::Db(e) => e.try_as_error(),
            Self::Transition(e) => e.try_as_error(),
        }
    }
}

#[cfg(test)]
mod spec {
    use serde_json::json;
    use service::domain::booking;

    use crate::AsError as _;

    use super::{Cancellation, Draft};

    #[test]
    fn accepts_legacy_field_names() {
        let d: Draft = serde_json::from_value(json!({
            "providerId": "6a2f41a3-c54c-fce8-32d2-0324e1c32e22",
            "startTime": "2025-06-02T09:00:00Z",
            "duration": 90,
            "recurringPattern": {"every": "week"},
        }))
        .unwrap();

        assert!(!d.is_recurring);
        assert_eq!(d.duration, Some(90));
        assert_eq!(d.recurrence_pattern, Some(json!({"every": "week"})));
    }

    #[test]
    fn reads_cancellation_reason() {
        let c: Cancellation =
            serde_json::from_value(json!({"cancellationReason": " sick "}))
                .unwrap();

        assert_eq!(
            c.cancellation_reason
                .and_then(booking::CancellationReason::new)
                .map(|r| r.to_string())
                .as_deref(),
            Some("sick"),
        );
    }

    #[test]
    fn reports_transitions_as_conflicts() {
        let err = booking::TransitionError::NotAllowed {
            from: booking::Status::Completed,
            to: booking::Status::Pending,
        }
        .try_as_error()
        .unwrap();

        assert_eq!(err.status_code.as_u16(), 409);
        assert_eq!(&*err.code, "TRANSITION_NOT_ALLOWED");
    }

    #[test]
    fn reports_missing_reason_as_invalid_field() {
        let err = booking::TransitionError::ReasonRequired
            .try_as_error()
            .unwrap();

        assert_eq!(err.status_code.as_u16(), 400);
        assert_eq!(err.fields[0].field, "cancellationReason");
    }
}
