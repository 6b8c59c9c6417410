//! [`User`] definitions.

pub mod session;

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

pub use self::session::Session;

/// Platform user: a client requesting services, a maid providing them, or an
/// administrator.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`]
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`Email`] of this [`User`], used as the login.
    pub email: Email,

    /// [`PasswordHash`] of this [`User`].
    pub password_hash: PasswordHash,

    /// [`Phone`] of this [`User`].
    pub phone: Option<Phone>,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// Hourly rate this [`User`] charges for the provided services.
    ///
    /// Always present for [`Role::Maid`].
    pub hourly_rate: Option<Money>,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`User`] was deleted.
    pub deleted_at: Option<DeletionDateTime>,
}

impl User {
    /// Indicates whether this [`User`] is an active [`Role::Maid`].
    #[must_use]
    pub fn is_active_maid(&self) -> bool {
        self.role == Role::Maid && self.deleted_at.is_none()
    }

    /// Sets the hourly rate this [`Role::Maid`] charges, rounded to cents.
    ///
    /// # Errors
    ///
    /// If this [`User`] is not a [`Role::Maid`], or the `rate` is not
    /// positive.
    pub fn set_hourly_rate(&mut self, rate: Money) -> Result<(), RateError> {
        if self.role != Role::Maid {
            return Err(RateError::NotMaid(self.role));
        }
        let rate = rate.round();
        if rate.amount.is_sign_negative() || rate.is_zero() {
            return Err(RateError::NonPositive(rate));
        }
        self.hourly_rate = Some(rate);
        Ok(())
    }
}

/// Error of setting an hourly rate of a [`User`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum RateError {
    /// Only [`Role::Maid`]s charge an hourly rate.
    #[display("`{_0}` users don't charge an hourly rate")]
    NotMaid(#[error(not(source))] Role),

    /// Hourly rate is zero or negative.
    #[display("Hourly rate must be positive, not {_0}")]
    NonPositive(#[error(not(source))] Money),
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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

define_kind! {
    #[doc = "Role of a [`User`] on the platform."]
    enum Role {
        #[doc = "Homeowner requesting cleaning services."]
        Client = 1,

        #[doc = "Cleaner providing services."]
        Maid = 2,

        #[doc = "Platform administrator."]
        Admin = 3,
    }
}

impl Role {
    /// Resolves the [`Capabilities`] granted by this [`Role`].
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Client => Capabilities {
                request_services: true,
                provide_services: false,
                review_quotations: false,
                manage_users: false,
            },
            Self::Maid => Capabilities {
                request_services: false,
                provide_services: true,
                review_quotations: false,
                manage_users: false,
            },
            Self::Admin => Capabilities {
                request_services: true,
                provide_services: false,
                review_quotations: true,
                manage_users: true,
            },
        }
    }
}

/// Set of actions a [`User`] is allowed to perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[expect(clippy::struct_excessive_bools, reason = "capability flags")]
pub struct Capabilities {
    /// Whether the [`User`] may book services as a client.
    pub request_services: bool,

    /// Whether the [`User`] may be assigned as a provider.
    pub provide_services: bool,

    /// Whether the [`User`] may review all pending quotations.
    pub review_quotations: bool,

    /// Whether the [`User`] may browse all the registered [`User`]s.
    pub manage_users: bool,
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `name` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a new [`Name`] if the given `name` is valid.
    ///
    /// Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let name = name.trim();
        Self::check(name).then(|| Self(name.to_owned()))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: &str) -> bool {
        !name.is_empty()
            && name.chars().count() <= 256
            && !name.chars().any(char::is_control)
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct Password(String);

impl Password {
    /// Minimal number of characters in a [`Password`].
    pub const MIN_LEN: usize = 6;

    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: &str) -> bool {
        (Self::MIN_LEN..=128).contains(&password.chars().count())
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Password hash of a [`User`].
///
/// SHA-256 digest of the [`User`] ID followed by the [`Password`], so equal
/// passwords of different [`User`]s never share a hash.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes the given [`Password`] of the [`User`] with the provided [`Id`].
    #[must_use]
    pub fn new(user_id: Id, password: &Password) -> Self {
        // TODO: Use `argon2` or any other secure hashing algorithm.
        let mut hasher = Sha256::new();
        hasher.update(Uuid::from(user_id).as_bytes());
        hasher.update(password.0.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

/// Email address.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `address` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Creates a new [`Email`] if the given `address` is valid.
    ///
    /// The address is trimmed and lowercased.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into().trim().to_lowercase();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` has a `local@domain.tld` shape.
    fn check(address: &str) -> bool {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        address.len() <= 320 && REGEX.is_match(address)
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Phone number.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Minimal number of digits in a [`Phone`].
    pub const MIN_DIGITS: usize = 7;

    /// Creates a new [`Phone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` matches the format.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Phone`] if the given `number` is valid.
    ///
    /// Formatting characters are stripped: the stored number consists of
    /// digits only, with an optional leading `+`.
    #[must_use]
    pub fn new(number: impl AsRef<str>) -> Option<Self> {
        let number = number.as_ref().trim();
        let digits = number
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>();
        if digits.len() < Self::MIN_DIGITS || digits.len() > 20 {
            return None;
        }
        Some(Self(if number.starts_with('+') {
            format!("+{digits}")
        } else {
            digits
        }))
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;

/// [`DateTime`] when a [`User`] was deleted.
pub type DeletionDateTime = DateTimeOf<(User, unit::Deletion)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTime, Money};

    use super::{
        Email, Id, Name, Password, PasswordHash, Phone, RateError, Role, User,
    };

    fn usd(amount: &str) -> Money {
        Money {
            amount: amount.parse().unwrap(),
            currency: Currency::Usd,
        }
    }

    fn user(role: Role) -> User {
        let id = Id::new();
        User {
            id,
            name: Name::new("Jane Doe").unwrap(),
            email: Email::new("jane@example.com").unwrap(),
            password_hash: PasswordHash::new(
                id,
                &Password::new("secret1").unwrap(),
            ),
            phone: None,
            role,
            hourly_rate: (role == Role::Maid).then(|| usd("25")),
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        }
    }

    #[test]
    fn validates_emails() {
        assert_eq!(
            AsRef::<str>::as_ref(&Email::new(" Jane.Doe@Example.COM ").unwrap()),
            "jane.doe@example.com",
        );
        assert!(Email::new("jane@example").is_none());
        assert!(Email::new("jane doe@example.com").is_none());
        assert!(Email::new("@example.com").is_none());
    }

    #[test]
    fn normalizes_phones() {
        assert_eq!(
            AsRef::<str>::as_ref(&Phone::new("+1 (555) 010-9999").unwrap()),
            "+15550109999",
        );
        assert_eq!(AsRef::<str>::as_ref(&Phone::new("555-0101").unwrap()), "5550101");
        assert!(Phone::new("555-010").is_none());
        assert!(Phone::new("call me").is_none());
    }

    #[test]
    fn trims_names() {
        assert_eq!(Name::new("  Jane ").unwrap().to_string(), "Jane");
        assert!(Name::new("   ").is_none());
    }

    #[test]
    fn salts_password_hashes() {
        let password = Password::new("secret-pass").unwrap();
        let (a, b) = (Id::new(), Id::new());

        assert_eq!(PasswordHash::new(a, &password), PasswordHash::new(a, &password));
        assert_ne!(PasswordHash::new(a, &password), PasswordHash::new(b, &password));
        assert_eq!(PasswordHash::new(a, &password).to_string().len(), 64);
        assert!(Password::new("short").is_none());
    }

    #[test]
    fn resolves_capabilities() {
        assert!(Role::Client.capabilities().request_services);
        assert!(!Role::Client.capabilities().provide_services);
        assert!(Role::Maid.capabilities().provide_services);
        assert!(Role::Admin.capabilities().review_quotations);
        assert!(!Role::Maid.capabilities().review_quotations);
        assert!(Role::Admin.capabilities().manage_users);
        assert!(!Role::Client.capabilities().manage_users);
    }

    #[test]
    fn sets_hourly_rate_of_maids_only() {
        let mut maid = user(Role::Maid);
        let mut client = user(Role::Client);

        maid.set_hourly_rate(usd("32.499")).unwrap();
        assert_eq!(maid.hourly_rate, Some(usd("32.50")));

        assert!(matches!(
            maid.set_hourly_rate(usd("0.004")),
            Err(RateError::NonPositive(_)),
        ));
        assert!(matches!(
            maid.set_hourly_rate(usd("-5")),
            Err(RateError::NonPositive(_)),
        ));
        assert_eq!(maid.hourly_rate, Some(usd("32.50")));

        assert!(matches!(
            client.set_hourly_rate(usd("25")),
            Err(RateError::NotMaid(Role::Client)),
        ));
        assert_eq!(client.hourly_rate, None);
    }
}
