//! [`Booking`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Minutes, Money, Percent};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{quotation, user};

/// Cleaning job booked by a client with a provider.
#[derive(Clone, Debug, PartialEq)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the client who booked the job.
    pub client_id: user::Id,

    /// ID of the provider doing the job.
    pub provider_id: user::Id,

    /// ID of the accepted [`Quotation`] this [`Booking`] was made from.
    ///
    /// [`Quotation`]: crate::domain::Quotation
    pub quotation_id: Option<quotation::Id>,

    /// [`Schedule`] of the job.
    pub schedule: Schedule,

    /// [`Financials`] of the job.
    pub financials: Financials,

    /// Current [`Status`] of this [`Booking`].
    pub status: Status,

    /// Free-form instructions for the provider.
    pub special_instructions: Option<String>,

    /// Whether the job repeats.
    pub is_recurring: bool,

    /// Client-defined description of how the job repeats.
    pub recurrence_pattern: Option<serde_json::Value>,

    /// Why this [`Booking`] was cancelled.
    pub cancellation_reason: Option<CancellationReason>,

    /// [`DateTime`] when this [`Booking`] was cancelled.
    pub cancelled_at: Option<CancellationDateTime>,

    /// [`DateTime`] when this [`Booking`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Booking`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Booking {
    /// Returns the [`Party`] the [`User`] with the provided ID takes in this
    /// [`Booking`], if any.
    ///
    /// [`User`]: crate::domain::User
    #[must_use]
    pub fn party_of(&self, user_id: user::Id) -> Option<Party> {
        if self.provider_id == user_id {
            Some(Party::Provider)
        } else if self.client_id == user_id {
            Some(Party::Client)
        } else {
            None
        }
    }

    /// Moves this [`Booking`] into the provided [`Status`] on behalf of the
    /// provided [`Party`].
    ///
    /// [`Status::Cancelled`] is only reachable via [`Booking::cancel()`].
    ///
    /// # Errors
    ///
    /// If the transition is not allowed.
    pub fn transition<Of: ?Sized>(
        &mut self,
        to: Status,
        by: Party,
        policy: Policy,
        now: DateTimeOf<Of>,
    ) -> Result<(), TransitionError> {
        if to == Status::Cancelled {
            return Err(TransitionError::ReasonRequired);
        }
        self.check_transition(to, by, policy)?;

        self.status = to;
        self.updated_at = now.coerce();
        Ok(())
    }

    /// Cancels this [`Booking`] for the provided reason.
    ///
    /// # Errors
    ///
    /// If this [`Booking`] cannot be cancelled anymore.
    pub fn cancel<Of: ?Sized>(
        &mut self,
        reason: CancellationReason,
        by: Party,
        now: DateTimeOf<Of>,
    ) -> Result<(), TransitionError> {
        self.check_transition(Status::Cancelled, by, Policy::Party)?;

        self.status = Status::Cancelled;
        self.cancellation_reason = Some(reason);
        self.cancelled_at = Some(now.coerce());
        self.updated_at = now.coerce();
        Ok(())
    }

    /// Checks whether this [`Booking`] may move into the provided [`Status`].
    fn check_transition(
        &self,
        to: Status,
        by: Party,
        policy: Policy,
    ) -> Result<(), TransitionError> {
        if !self.status.can_become(to) {
            return Err(TransitionError::NotAllowed {
                from: self.status,
                to,
            });
        }
        if !policy.permits(by, to) {
            return Err(TransitionError::Forbidden { party: by, to });
        }
        Ok(())
    }
}

/// ID of a [`Booking`].
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
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Time slot of a [`Booking`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Schedule {
    /// [`DateTime`] when the job starts.
    pub start_time: StartDateTime,

    /// [`DateTime`] when the job ends.
    pub end_time: EndDateTime,

    /// Duration of the job, always equal to `end_time - start_time`.
    pub duration: Minutes,
}

impl Schedule {
    /// Shortest possible job.
    pub const MIN_DURATION: Minutes = Minutes::new(30);

    /// Creates a new [`Schedule`] between the provided moments.
    ///
    /// # Errors
    ///
    /// If the slot is empty, reversed, not made of whole minutes or shorter
    /// than [`Schedule::MIN_DURATION`].
    pub fn new(
        start_time: StartDateTime,
        end_time: EndDateTime,
    ) -> Result<Self, ScheduleError> {
        let span = end_time
            .since(start_time)
            .filter(|d| !d.is_zero())
            .ok_or(ScheduleError::EndsBeforeStart)?;
        if span.as_secs() % 60 != 0 || span.subsec_nanos() != 0 {
            return Err(ScheduleError::FractionalMinutes);
        }
        let duration = Minutes::from_duration(span)
            .ok_or(ScheduleError::TooLong)?;
        if duration < Self::MIN_DURATION {
            return Err(ScheduleError::TooShort(duration));
        }
        Ok(Self {
            start_time,
            end_time,
            duration,
        })
    }

    /// Creates a new [`Schedule`] starting at the provided moment and lasting
    /// the provided [`Minutes`].
    ///
    /// # Errors
    ///
    /// If the `duration` is shorter than [`Schedule::MIN_DURATION`], or the
    /// job would end past the last representable moment.
    pub fn starting_at(
        start_time: StartDateTime,
        duration: Minutes,
    ) -> Result<Self, ScheduleError> {
        let end_time = start_time
            .checked_add(Duration::from_secs(u64::from(duration.get()) * 60))
            .ok_or(ScheduleError::TooLong)?
            .coerce();
        Self::new(start_time, end_time)
    }
}

/// Error of creating a [`Schedule`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ScheduleError {
    /// Job ends before it starts.
    #[display("`endTime` must be after `startTime`")]
    EndsBeforeStart,

    /// Job duration is not a whole number of minutes.
    #[display("Job must last a whole number of minutes")]
    FractionalMinutes,

    /// Job is too short.
    #[display("Job must last at least {} minutes, not {_0}", Schedule::MIN_DURATION)]
    TooShort(#[error(not(source))] Minutes),

    /// Job is too long.
    #[display("Job is too long")]
    TooLong,
}

/// Money split of a [`Booking`] between the platform and the provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Financials {
    /// Amount paid by the client.
    pub total_amount: Money,

    /// Part of the [`Financials::total_amount`] kept by the platform.
    pub platform_fee: Money,

    /// Part of the [`Financials::total_amount`] earned by the provider.
    pub provider_earnings: Money,
}

impl Financials {
    /// Computes the [`Financials`] of a job lasting `duration` with a
    /// provider charging `hourly_rate`.
    ///
    /// The fee and the total are rounded, so the earnings absorb the rounding
    /// and `platform_fee + provider_earnings == total_amount` always holds.
    #[must_use]
    pub fn compute(
        hourly_rate: Money,
        duration: Minutes,
        fee_rate: Percent,
    ) -> Self {
        let total_amount = (hourly_rate * duration.hours()).round();
        let platform_fee = fee_rate.of(total_amount).round();
        Self {
            total_amount,
            platform_fee,
            provider_earnings: Money {
                amount: total_amount.amount - platform_fee.amount,
                currency: total_amount.currency,
            },
        }
    }
}

define_kind! {
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "Waiting for confirmation."]
        Pending = 1,

        #[doc = "Confirmed by the parties."]
        Confirmed = 2,

        #[doc = "Job is being done."]
        InProgress = 3,

        #[doc = "Job is done."]
        Completed = 4,

        #[doc = "Job was called off."]
        Cancelled = 5,

        #[doc = "Job outcome is contested."]
        Disputed = 6,
    }
}

impl Status {
    /// Indicates whether no further transitions are possible from this
    /// [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Disputed)
    }

    /// Indicates whether a [`Booking`] in this [`Status`] may move into the
    /// provided one.
    #[must_use]
    pub const fn can_become(self, to: Self) -> bool {
        match (self, to) {
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::InProgress)
            | (Self::InProgress, Self::Completed) => true,
            (from, Self::Cancelled | Self::Disputed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Side a [`User`] takes in a [`Booking`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Party {
    /// Client who booked the job.
    #[display("client")]
    Client,

    /// Provider doing the job.
    #[display("provider")]
    Provider,
}

/// Policy deciding which [`Party`] may drive which [`Status`] transitions.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Any [`Party`] may perform any allowed transition.
    #[default]
    Party,

    /// Only the provider confirms, starts and completes a job.
    Strict,
}

impl Policy {
    /// Indicates whether the provided [`Party`] may move a [`Booking`] into
    /// the provided [`Status`].
    #[must_use]
    pub const fn permits(self, by: Party, to: Status) -> bool {
        match self {
            Self::Party => true,
            Self::Strict => match to {
                Status::Confirmed | Status::InProgress | Status::Completed => {
                    matches!(by, Party::Provider)
                }
                Status::Pending | Status::Cancelled | Status::Disputed => true,
            },
        }
    }
}

/// Reason of a [`Booking`] cancellation.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CancellationReason(String);

impl CancellationReason {
    /// Creates a new [`CancellationReason`] if the given `reason` is not
    /// blank.
    #[must_use]
    pub fn new(reason: impl AsRef<str>) -> Option<Self> {
        let reason = reason.as_ref().trim();
        (!reason.is_empty() && reason.chars().count() <= 1000)
            .then(|| Self(reason.to_owned()))
    }
}

/// Error of changing a [`Booking`] [`Status`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TransitionError {
    /// Transition is not in the lifecycle.
    #[display("`Booking` cannot move from {from} to {to}")]
    NotAllowed {
        /// Current [`Status`].
        from: Status,

        /// Requested [`Status`].
        to: Status,
    },

    /// [`Party`] is not allowed to perform the transition.
    #[display("Booking {party} cannot move it to {to}")]
    Forbidden {
        /// [`Party`] requesting the transition.
        party: Party,

        /// Requested [`Status`].
        to: Status,
    },

    /// Cancellation requires a reason.
    #[display("Cancelling a `Booking` requires a reason")]
    ReasonRequired,
}

/// [`DateTime`] when a [`Booking`] starts.
pub type StartDateTime = DateTimeOf<(Booking, Start)>;

/// [`DateTime`] when a [`Booking`] ends.
pub type EndDateTime = DateTimeOf<(Booking, End)>;

/// [`DateTime`] when a [`Booking`] was cancelled.
pub type CancellationDateTime = DateTimeOf<(Booking, unit::Cancellation)>;

/// [`DateTime`] when a [`Booking`] was created.
pub type CreationDateTime = DateTimeOf<(Booking, unit::Creation)>;

/// [`DateTime`] when a [`Booking`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Booking, unit::Modification)>;

/// Marker of a [`Booking`] start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker of a [`Booking`] end.
#[derive(Clone, Copy, Debug)]
pub struct End;

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Minutes, Money, Percent};
    use rust_decimal::Decimal;

    use crate::domain::user;

    use super::{
        Booking, CancellationReason, Financials, Id, Party, Policy, Schedule,
        ScheduleError, Status, TransitionError,
    };

    fn at(s: &str) -> DateTime {
        DateTime::from_rfc3339(s).unwrap()
    }

    fn usd(cents: i64) -> Money {
        Money {
            amount: Decimal::new(cents, 2),
            currency: Currency::Usd,
        }
    }

    fn booking() -> Booking {
        let schedule = Schedule::new(
            at("2025-06-02T09:00:00Z").coerce(),
            at("2025-06-02T10:30:00Z").coerce(),
        )
        .unwrap();
        let now = at("2025-06-01T10:00:00Z");
        Booking {
            id: Id::new(),
            client_id: user::Id::new(),
            provider_id: user::Id::new(),
            quotation_id: None,
            financials: Financials::compute(
                usd(2500),
                schedule.duration,
                "15".parse().unwrap(),
            ),
            schedule,
            status: Status::Pending,
            special_instructions: None,
            is_recurring: false,
            recurrence_pattern: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: now.coerce(),
            updated_at: now.coerce(),
        }
    }

    #[test]
    fn splits_financials() {
        let f = Financials::compute(
            usd(2500),
            Minutes::new(90),
            "15".parse::<Percent>().unwrap(),
        );

        assert_eq!(f.total_amount, usd(3750));
        assert_eq!(f.platform_fee, usd(563));
        assert_eq!(f.provider_earnings, usd(3187));
        assert_eq!(
            f.platform_fee.amount + f.provider_earnings.amount,
            f.total_amount.amount,
        );
    }

    #[test]
    fn fee_and_earnings_always_sum_to_total() {
        let fee = "15".parse::<Percent>().unwrap();
        for cents in [1999, 2333, 2750, 4125] {
            for minutes in [30, 45, 95, 127, 480] {
                let f = Financials::compute(usd(cents), Minutes::new(minutes), fee);
                assert_eq!(
                    f.platform_fee.amount + f.provider_earnings.amount,
                    f.total_amount.amount,
                );
            }
        }
    }

    #[test]
    fn derives_duration_from_schedule() {
        let s = Schedule::new(
            at("2025-06-02T09:00:00Z").coerce(),
            at("2025-06-02T10:30:00Z").coerce(),
        )
        .unwrap();
        assert_eq!(s.duration, Minutes::new(90));

        let s = Schedule::starting_at(at("2025-06-02T09:00:00Z").coerce(), Minutes::new(45))
            .unwrap();
        assert_eq!(s.end_time, at("2025-06-02T09:45:00Z").coerce());
    }

    #[test]
    fn rejects_bad_schedules() {
        let start = at("2025-06-02T09:00:00Z");

        assert!(matches!(
            Schedule::new(start.coerce(), start.coerce()),
            Err(ScheduleError::EndsBeforeStart),
        ));
        assert!(matches!(
            Schedule::new(start.coerce(), at("2025-06-02T08:00:00Z").coerce()),
            Err(ScheduleError::EndsBeforeStart),
        ));
        assert!(matches!(
            Schedule::new(start.coerce(), at("2025-06-02T09:20:00Z").coerce()),
            Err(ScheduleError::TooShort(_)),
        ));
        assert!(matches!(
            Schedule::new(start.coerce(), at("2025-06-02T09:45:30Z").coerce()),
            Err(ScheduleError::FractionalMinutes),
        ));
        assert!(matches!(
            Schedule::starting_at(start.coerce(), Minutes::new(u32::MAX)),
            Err(ScheduleError::TooLong),
        ));
        assert!(matches!(
            Schedule::starting_at(
                at("9999-12-31T23:00:00Z").coerce(),
                Minutes::new(120),
            ),
            Err(ScheduleError::TooLong),
        ));
    }

    #[test]
    fn follows_lifecycle() {
        let mut b = booking();
        let now = at("2025-06-02T09:00:00Z");

        for to in [Status::Confirmed, Status::InProgress, Status::Completed] {
            b.transition(to, Party::Client, Policy::Party, now).unwrap();
            assert_eq!(b.status, to);
        }

        for to in Status::ALL {
            assert!(b.transition(*to, Party::Provider, Policy::Party, now).is_err());
        }
    }

    #[test]
    fn refuses_skipping_states() {
        let mut b = booking();
        let now = at("2025-06-02T09:00:00Z");

        let err = b
            .transition(Status::Completed, Party::Provider, Policy::Party, now)
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::NotAllowed {
                from: Status::Pending,
                to: Status::Completed,
            },
        ));
        assert_eq!(b.updated_at, at("2025-06-01T10:00:00Z").coerce());
    }

    #[test]
    fn strict_policy_leaves_progress_to_provider() {
        let mut b = booking();
        let now = at("2025-06-02T09:00:00Z");

        assert!(matches!(
            b.transition(Status::Confirmed, Party::Client, Policy::Strict, now),
            Err(TransitionError::Forbidden { .. }),
        ));
        b.transition(Status::Confirmed, Party::Provider, Policy::Strict, now)
            .unwrap();
        b.transition(Status::Disputed, Party::Client, Policy::Strict, now)
            .unwrap();
        assert_eq!(b.status, Status::Disputed);
    }

    #[test]
    fn cancels_with_reason_once() {
        let mut b = booking();
        let now = at("2025-06-01T12:00:00Z");

        assert!(matches!(
            b.transition(Status::Cancelled, Party::Client, Policy::Party, now),
            Err(TransitionError::ReasonRequired),
        ));
        assert!(CancellationReason::new("   ").is_none());

        let reason = CancellationReason::new("Sick").unwrap();
        b.cancel(reason.clone(), Party::Client, now).unwrap();
        assert_eq!(b.status, Status::Cancelled);
        assert_eq!(b.cancelled_at, Some(now.coerce()));

        let later = at("2025-06-01T13:00:00Z");
        assert!(b.cancel(reason, Party::Provider, later).is_err());
        assert_eq!(b.cancelled_at, Some(now.coerce()));
    }

    #[test]
    fn knows_parties() {
        let b = booking();

        assert_eq!(b.party_of(b.client_id), Some(Party::Client));
        assert_eq!(b.party_of(b.provider_id), Some(Party::Provider));
        assert_eq!(b.party_of(user::Id::new()), None);
    }
}
