//! [`Quotation`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, Date, DateTimeOf, Minutes, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{catalog, pricing, user};

/// Price quotation for a cleaning job, requested by a customer or a guest.
#[derive(Clone, Debug, PartialEq)]
pub struct Quotation {
    /// ID of this [`Quotation`].
    pub id: Id,

    /// [`Requestor`] of this [`Quotation`].
    pub requestor: Requestor,

    /// Services this [`Quotation`] is requested for.
    pub selection: Selection,

    /// Attributes of the property to be cleaned.
    pub attributes: pricing::Attributes,

    /// [`Location`] of the property to be cleaned.
    pub location: Location,

    /// [`Frequency`] of the job, once chosen.
    pub frequency: Option<Frequency>,

    /// Estimated duration of the job.
    pub estimated_duration: Minutes,

    /// Estimated price of the job, if any.
    pub estimated_price: Option<Money>,

    /// Free-form requirements of the customer.
    pub special_requirements: Option<String>,

    /// [`Date`] the customer prefers the job to be done on.
    pub preferred_date: Option<Date>,

    /// Time of day the customer prefers (free-form, like `morning`).
    pub preferred_time: Option<String>,

    /// Stored [`Status`] of this [`Quotation`].
    ///
    /// Use [`Quotation::status_at()`] to account for expiration.
    pub status: Status,

    /// ID of the provider assigned on acceptance.
    pub provider_id: Option<user::Id>,

    /// [`DateTime`] until which this [`Quotation`] may be accepted.
    pub valid_until: ExpirationDateTime,

    /// [`DateTime`] when this [`Quotation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Quotation`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Quotation {
    /// Returns the [`Status`] of this [`Quotation`] as observed at the
    /// provided moment.
    ///
    /// A [`Status::Pending`] [`Quotation`] is reported as
    /// [`Status::Expired`] once its [`Quotation::valid_until`] has passed.
    #[must_use]
    pub fn status_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> Status {
        match self.status {
            Status::Pending if now.coerce() > self.valid_until => {
                Status::Expired
            }
            s @ (Status::Pending
            | Status::Accepted
            | Status::Rejected
            | Status::Expired) => s,
        }
    }

    /// Indicates whether the [`User`] with the provided ID owns this
    /// [`Quotation`].
    ///
    /// [`User`]: crate::domain::User
    #[must_use]
    pub fn is_owned_by(&self, user_id: user::Id) -> bool {
        matches!(self.requestor, Requestor::Customer(id) if id == user_id)
    }

    /// Indicates whether the [`User`] with the provided ID may decide on this
    /// [`Quotation`]: either owns it, or may take over a guest one.
    ///
    /// [`User`]: crate::domain::User
    #[must_use]
    pub fn is_decidable_by(&self, user_id: user::Id) -> bool {
        match self.requestor {
            Requestor::Customer(id) => id == user_id,
            Requestor::Guest(_) => true,
        }
    }

    /// Ensures this [`Quotation`] may still be edited at the provided moment.
    ///
    /// # Errors
    ///
    /// If this [`Quotation`] is not [`Status::Pending`] anymore.
    pub fn ensure_pending<Of: ?Sized>(
        &self,
        now: DateTimeOf<Of>,
    ) -> Result<(), TransitionError> {
        match self.status_at(now) {
            Status::Pending => Ok(()),
            Status::Expired => Err(TransitionError::Expired(self.valid_until)),
            s @ (Status::Accepted | Status::Rejected) => {
                Err(TransitionError::NotPending(s))
            }
        }
    }

    /// Accepts this [`Quotation`] on behalf of the provided customer,
    /// assigning the provided provider to it.
    ///
    /// The customer takes ownership of a guest [`Quotation`].
    ///
    /// # Errors
    ///
    /// If this [`Quotation`] is not [`Status::Pending`] at the provided moment.
    pub fn accept<Of: ?Sized>(
        &mut self,
        now: DateTimeOf<Of>,
        customer_id: user::Id,
        provider_id: user::Id,
    ) -> Result<(), TransitionError> {
        self.ensure_pending(now)?;

        self.status = Status::Accepted;
        self.requestor = Requestor::Customer(customer_id);
        self.provider_id = Some(provider_id);
        self.updated_at = now.coerce();
        Ok(())
    }

    /// Rejects this [`Quotation`] on behalf of the provided customer.
    ///
    /// The customer takes ownership of a guest [`Quotation`].
    ///
    /// # Errors
    ///
    /// If this [`Quotation`] is not [`Status::Pending`] at the provided moment.
    pub fn reject<Of: ?Sized>(
        &mut self,
        now: DateTimeOf<Of>,
        customer_id: user::Id,
    ) -> Result<(), TransitionError> {
        self.ensure_pending(now)?;

        self.status = Status::Rejected;
        self.requestor = Requestor::Customer(customer_id);
        self.updated_at = now.coerce();
        Ok(())
    }
}

/// ID of a [`Quotation`].
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

/// Party requesting a [`Quotation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Requestor {
    /// Authenticated customer.
    Customer(user::Id),

    /// Unauthenticated visitor.
    Guest(Guest),
}

/// Unauthenticated visitor requesting a [`Quotation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Guest {
    /// Name of the visitor.
    pub name: user::Name,

    /// How to reach the visitor.
    pub contact: Contact,
}

/// Contact of a [`Guest`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Contact {
    /// Email address.
    Email(user::Email),

    /// Phone number.
    Phone(user::Phone),
}

impl Contact {
    /// Classifies a free-form contact: an [`user::Email`] if it looks like
    /// `local@domain.tld`, otherwise a [`user::Phone`] if it contains enough
    /// digits.
    ///
    /// [`None`] is returned if the contact is neither.
    #[must_use]
    pub fn classify(raw: &str) -> Option<Self> {
        user::Email::new(raw)
            .map(Self::Email)
            .or_else(|| user::Phone::new(raw).map(Self::Phone))
    }

    /// Returns the [`user::Email`] of this [`Contact`], if any.
    #[must_use]
    pub const fn email(&self) -> Option<&user::Email> {
        match self {
            Self::Email(e) => Some(e),
            Self::Phone(_) => None,
        }
    }

    /// Returns the [`user::Phone`] of this [`Contact`], if any.
    #[must_use]
    pub const fn phone(&self) -> Option<&user::Phone> {
        match self {
            Self::Phone(p) => Some(p),
            Self::Email(_) => None,
        }
    }
}

/// Services a [`Quotation`] is requested for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// Entries of a service catalog.
    Catalog {
        /// [`catalog::Scope`] the entries are chosen from.
        scope: catalog::Scope,

        /// Main services (at least one).
        main: Vec<catalog::Id>,

        /// Add-on services.
        extras: Vec<catalog::Id>,
    },

    /// Coarse [`pricing::ServiceType`] of older clients.
    Legacy(pricing::ServiceType),
}

/// Location of a cleaned property.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    /// [`Zipcode`] of the property.
    pub zipcode: Zipcode,

    /// Street address of the property.
    pub address: Option<String>,

    /// City of the property.
    pub city: Option<String>,
}

/// Postal code.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Zipcode(String);

impl Zipcode {
    /// Creates a new [`Zipcode`] if the given `code` is valid.
    #[must_use]
    pub fn new(code: impl AsRef<str>) -> Option<Self> {
        let code = code.as_ref().trim();
        let valid = (3..=10).contains(&code.len())
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-'));
        valid.then(|| Self(code.to_owned()))
    }
}

impl std::str::FromStr for Zipcode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Zipcode`")
    }
}

define_kind! {
    #[doc = "How often a job is repeated."]
    enum Frequency {
        #[doc = "Single job."]
        OneTime = 1,

        #[doc = "Every week."]
        Weekly = 2,

        #[doc = "Every other week."]
        Biweekly = 3,

        #[doc = "Every month."]
        Monthly = 4,
    }
}

define_kind! {
    #[doc = "Status of a [`Quotation`]."]
    enum Status {
        #[doc = "Waiting for a decision."]
        Pending = 1,

        #[doc = "Accepted by the customer."]
        Accepted = 2,

        #[doc = "Rejected by the customer."]
        Rejected = 3,

        #[doc = "Not decided on in time."]
        Expired = 4,
    }
}

/// Error of changing a [`Quotation`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum TransitionError {
    /// [`Quotation`] has expired.
    #[display("`Quotation` expired at {_0}")]
    Expired(#[error(not(source))] ExpirationDateTime),

    /// [`Quotation`] is not [`Status::Pending`].
    #[display("`Quotation` is {_0}, not PENDING")]
    NotPending(#[error(not(source))] Status),
}

/// [`DateTime`] when a [`Quotation`] was created.
pub type CreationDateTime = DateTimeOf<(Quotation, unit::Creation)>;

/// [`DateTime`] when a [`Quotation`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Quotation, unit::Modification)>;

/// [`DateTime`] when a [`Quotation`] expires.
pub type ExpirationDateTime = DateTimeOf<(Quotation, unit::Expiration)>;


#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use crate::domain::user;

    use super::{fixture, Contact, Requestor, Status, TransitionError};

    fn created() -> DateTime {
        DateTime::from_rfc3339("2025-06-01T10:00:00Z").unwrap()
    }

    #[test]
    fn classifies_contacts() {
        assert!(matches!(
            Contact::classify("jane@example.com"),
            Some(Contact::Email(_)),
        ));
        assert!(matches!(
            Contact::classify("+1 (555) 010-9999"),
            Some(Contact::Phone(_)),
        ));
        assert!(matches!(Contact::classify("555-0101"), Some(Contact::Phone(_))));
        assert!(Contact::classify("jane@example").is_none());
        assert!(Contact::classify("555-01").is_none());
        assert_eq!(
            Contact::classify("call me maybe 5550101"),
            Some(Contact::Phone(user::Phone::new("5550101").unwrap())),
        );
        assert!(matches!(
            Contact::classify("tel: 555-0101"),
            Some(Contact::Phone(_)),
        ));
        assert!(matches!(
            Contact::classify("555/0101/22"),
            Some(Contact::Phone(_)),
        ));
        assert!(matches!(
            Contact::classify("jane@example 212 555 0100"),
            Some(Contact::Phone(_)),
        ));
        assert!(Contact::classify("call me maybe").is_none());
        assert!(Contact::classify("").is_none());
    }

    #[test]
    fn expires_lazily() {
        let q = fixture::pending(created());
        let valid_until: DateTime = q.valid_until.coerce();

        assert_eq!(q.status_at(created()), Status::Pending);
        assert_eq!(q.status_at(valid_until), Status::Pending);
        assert_eq!(
            q.status_at(valid_until + Duration::from_secs(1)),
            Status::Expired,
        );
        assert_eq!(q.status, Status::Pending);
    }

    #[test]
    fn accepts_exactly_at_validity_end() {
        let customer = user::Id::new();
        let provider = user::Id::new();
        let mut q = fixture::pending(created());
        let valid_until: DateTime = q.valid_until.coerce();

        q.accept(valid_until, customer, provider).unwrap();

        assert_eq!(q.status, Status::Accepted);
        assert_eq!(q.provider_id, Some(provider));
        assert_eq!(q.requestor, Requestor::Customer(customer));
        assert!(q.is_owned_by(customer));
    }

    #[test]
    fn refuses_acceptance_after_expiry() {
        let mut q = fixture::pending(created());
        let late: DateTime = q.valid_until.coerce();

        let err = q
            .accept(late + Duration::from_secs(1), user::Id::new(), user::Id::new())
            .unwrap_err();

        assert!(matches!(err, TransitionError::Expired(_)));
        assert_eq!(q.status, Status::Pending);
        assert_eq!(q.provider_id, None);
    }

    #[test]
    fn rejects_only_pending() {
        let customer = user::Id::new();
        let mut q = fixture::pending(created());
        let later = created() + Duration::from_secs(60);

        q.reject(later, customer).unwrap();
        let updated_at = q.updated_at;

        let err = q.reject(later + Duration::from_secs(60), customer).unwrap_err();

        assert!(matches!(err, TransitionError::NotPending(Status::Rejected)));
        assert_eq!(q.updated_at, updated_at);
        assert_eq!(q.status, Status::Rejected);
    }

    #[test]
    fn guest_quotations_are_decidable_by_anyone_but_owned_by_none() {
        let q = fixture::pending(created());
        let someone = user::Id::new();

        assert!(q.is_decidable_by(someone));
        assert!(!q.is_owned_by(someone));
    }
}
