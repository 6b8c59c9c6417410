//! [`User`]-related definitions.

use axum::http::StatusCode;
use common::{DateTime, Money};
use rust_decimal::Decimal;
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use service::{
    command::{self, create_user_session},
    domain::{self, user},
    query, read, Command as _,
};

use crate::{
    api::{self, non_blank, nullable, Json, Path, Query},
    define_error, AsError, Context, Error,
    error::Validation,
};

/// A `User` of the platform.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier of this `User`.
    pub id: user::Id,

    /// Name of this `User`.
    pub name: String,

    /// Email of this `User`, used to log in.
    pub email: String,

    /// Phone of this `User`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Role of this `User`.
    pub role: user::Role,

    /// Hourly rate of this `User`, if they provide services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<Money>,

    /// When this `User` has registered.
    pub created_at: DateTime,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: user.id,
            name: user.name.to_string(),
            email: user.email.to_string(),
            phone: user.phone.map(|p| p.to_string()),
            role: user.role,
            hourly_rate: user.hourly_rate,
            created_at: user.created_at.coerce(),
        }
    }
}

/// Issued session of a `User`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token to authorize requests with.
    pub token: String,

    /// When the `token` expires.
    pub expires_at: DateTime,

    /// `User` the session is issued for.
    pub user: User,
}

impl From<create_user_session::Output> for Session {
    fn from(output: create_user_session::Output) -> Self {
        Self {
            token: output.token.to_string(),
            expires_at: output.expires_at.coerce(),
            user: output.user.into(),
        }
    }
}

/// Registration form of a new `User`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Full name.
    name: Option<String>,

    /// First name, joined with the `last_name` if no `name` is provided.
    first_name: Option<String>,

    /// Last name.
    last_name: Option<String>,

    /// Email to log in with.
    email: String,

    /// Password to log in with.
    password: String,

    /// Phone number.
    #[serde(alias = "phoneNumber")]
    phone: Option<String>,

    /// `CLIENT` (default) or `MAID`.
    role: Option<String>,

    /// Hourly rate, required for a `MAID`.
    hourly_rate: Option<Decimal>,
}

impl Registration {
    /// Returns the full name of the registering `User`.
    fn full_name(&self) -> Option<String> {
        full_name(&self.name, &self.first_name, &self.last_name)
    }
}

/// Returns the provided full `name`, or joins the `first` and `last` ones.
fn full_name(
    name: &Option<String>,
    first: &Option<String>,
    last: &Option<String>,
) -> Option<String> {
    non_blank(name.clone()).or_else(|| {
        let parts = [first, last]
            .into_iter()
            .filter_map(|p| non_blank(p.clone()))
            .collect::<Vec<_>>();
        (!parts.is_empty()).then(|| parts.join(" "))
    })
}

/// Changes to contact details of the authenticated `User`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ProfilePatch {
    /// New full name.
    name: Option<String>,

    /// New first name, joined with the `last_name` if no `name` is provided.
    first_name: Option<String>,

    /// New last name.
    last_name: Option<String>,

    /// New email to log in with.
    email: Option<String>,

    /// New phone number, `null` removing it.
    #[serde(alias = "phoneNumber", deserialize_with = "nullable")]
    phone: Option<Option<String>>,
}

impl ProfilePatch {
    /// Validates this [`ProfilePatch`], recording invalid fields.
    fn parse(
        self,
        user_id: user::Id,
        v: &mut Validation,
    ) -> command::UpdateUserProfile {
        let named = [&self.name, &self.first_name, &self.last_name]
            .into_iter()
            .any(Option::is_some);
        let name = named.then(|| {
            v.check(
                "name",
                full_name(&self.name, &self.first_name, &self.last_name)
                    .and_then(user::Name::new),
                "must not be blank",
            )
        });
        let email = self.email.map(|e| {
            v.check(
                "email",
                user::Email::new(e),
                "must be a valid email address",
            )
        });
        let phone = self.phone.map(|p| {
            non_blank(p).map(|p| {
                v.check(
                    "phone",
                    user::Phone::new(p),
                    format!(
                        "must contain at least {} digits",
                        user::Phone::MIN_DIGITS,
                    ),
                )
            })
        });

        command::UpdateUserProfile {
            user_id,
            name: name.flatten(),
            email: email.flatten(),
            phone: phone.map(Option::flatten),
        }
    }
}

/// Services profile of the authenticated maid.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaidProfile {
    /// New hourly rate.
    hourly_rate: Decimal,
}

/// Filter of the listed `User`s.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// `CLIENT`, `MAID` or `ADMIN`.
    role: Option<String>,
}

/// Credentials of a `User`.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email of the `User`.
    email: String,

    /// Password of the `User`.
    password: String,
}

/// Registers a new `User` and logs them in.
///
/// # Errors
///
/// Possible error codes:
/// - `INVALID_FIELDS` - the form is malformed;
/// - `ADMIN_REGISTRATION` - `ADMIN`s cannot register themselves;
/// - `EMAIL_OCCUPIED` - the email is taken by another `User`;
/// - `HOURLY_RATE_REQUIRED` - a `MAID` registers without an hourly rate.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "register",
        email = %form.email,
        otel.name = api::SPAN_NAME,
        role = ?form.role,
    ),
)]
pub async fn register(
    ctx: Context,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<Session>), Error> {
    let mut v = Validation::new();
    let name = v.check(
        "name",
        form.full_name().and_then(user::Name::new),
        "must not be blank",
    );
    let email = v.check(
        "email",
        user::Email::new(form.email.as_str()),
        "must be a valid email address",
    );
    let password = v.check(
        "password",
        user::Password::new(form.password),
        format!(
            "must be at least {} characters long",
            user::Password::MIN_LEN,
        ),
    );
    let phone = non_blank(form.phone).map(|p| {
        v.check(
            "phone",
            user::Phone::new(p),
            format!("must contain at least {} digits", user::Phone::MIN_DIGITS),
        )
    });
    let role = v.check(
        "role",
        non_blank(form.role)
            .map_or(Some(user::Role::Client), |r| r.to_uppercase().parse().ok()),
        "must be either `CLIENT` or `MAID`",
    );
    let (Some(name), Some(email), Some(password), Some(role)) =
        (name, email, password, role)
    else {
        return Err(v.into_error());
    };
    v.finish()?;

    let currency = ctx.service().config().pricing.currency;
    let user = ctx
        .service()
        .execute(command::CreateUser {
            name,
            email,
            password: SecretBox::init_with(move || password),
            phone: phone.flatten(),
            role,
            hourly_rate: form
                .hourly_rate
                .map(|amount| Money { amount, currency }),
        })
        .await
        .map_err(AsError::into_error)?;
    let output = ctx
        .service()
        .execute(command::CreateUserSession::ByUserId(user.id))
        .await
        .map_err(AsError::into_error)?;

    Ok((StatusCode::CREATED, Json(output.into())))
}

/// Logs a `User` in with the provided credentials.
///
/// # Errors
///
/// Possible error codes:
/// - `WRONG_CREDENTIALS` - provided credentials do not match any `User`.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "login",
        email = %creds.email,
        otel.name = api::SPAN_NAME,
    ),
)]
pub async fn login(
    ctx: Context,
    Json(creds): Json<Credentials>,
) -> Result<Json<Session>, Error> {
    define_error! {
        enum Error {
            #[code = "WRONG_CREDENTIALS"]
            #[status = UNAUTHORIZED]
            #[message = "Provided credentials does not match any `User`"]
            WrongCredentials,
        }
    }

    let (Some(email), Some(password)) = (
        user::Email::new(creds.email),
        user::Password::new(creds.password),
    ) else {
        return Err(Error::WrongCredentials.into());
    };

    ctx.service()
        .execute(command::CreateUserSession::ByCredentials {
            email,
            password: SecretBox::init_with(move || password),
        })
        .await
        .map_err(AsError::into_error)
        .map(|o| Json(o.into()))
}

/// Returns the currently authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `INVALID_TOKEN` - the token is invalid, expired, or its `User` is gone.
#[tracing::instrument(
    skip_all,
    fields(api.name = "me", otel.name = api::SPAN_NAME),
)]
pub async fn me(ctx: Context) -> Result<Json<User>, Error> {
    define_error! {
        enum Error {
            #[code = "INVALID_TOKEN"]
            #[status = UNAUTHORIZED]
            #[message = "Authorization token is invalid or expired"]
            InvalidToken,
        }
    }

    let session = ctx.current_session().await?;

    ctx.service()
        .execute(query::user::ById::by(session.user_id))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::InvalidToken.into())
        .map(|u| Json(u.into()))
}

/// Changes contact details of the currently authenticated `User`.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `INVALID_TOKEN` - the token is invalid, expired, or its `User` is gone;
/// - `INVALID_FIELDS` - the patch is malformed;
/// - `EMAIL_OCCUPIED` - the email is taken by another `User`.
#[tracing::instrument(
    skip_all,
    fields(api.name = "updateProfile", otel.name = api::SPAN_NAME),
)]
pub async fn update_profile(
    ctx: Context,
    Json(patch): Json<ProfilePatch>,
) -> Result<Json<User>, Error> {
    let session = ctx.current_session().await?;

    let mut v = Validation::new();
    let cmd = patch.parse(session.user_id, &mut v);
    v.finish()?;

    ctx.service()
        .execute(cmd)
        .await
        .map_err(AsError::into_error)
        .map(|u| Json(u.into()))
}

/// Changes the hourly rate of the currently authenticated maid.
///
/// Bookings made before keep their rate.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` is not a maid;
/// - `NON_POSITIVE_HOURLY_RATE` - the rate is zero or negative.
#[tracing::instrument(
    skip_all,
    fields(
        api.name = "updateMaidProfile",
        hourly_rate = %profile.hourly_rate,
        otel.name = api::SPAN_NAME,
    ),
)]
pub async fn update_maid_profile(
    ctx: Context,
    Json(profile): Json<MaidProfile>,
) -> Result<Json<User>, Error> {
    let session = ctx.session_that(|c| c.provide_services).await?;

    let currency = ctx.service().config().pricing.currency;
    ctx.service()
        .execute(command::UpdateMaidRate {
            user_id: session.user_id,
            hourly_rate: Money {
                amount: profile.hourly_rate,
                currency,
            },
        })
        .await
        .map_err(AsError::into_error)
        .map(|u| Json(u.into()))
}

/// Returns the public profile of the maid with the provided ID.
///
/// # Errors
///
/// Possible error codes:
/// - `MAID_NOT_EXISTS` - no active maid has the provided ID.
#[tracing::instrument(
    skip_all,
    fields(api.name = "maid", id = %id, otel.name = api::SPAN_NAME),
)]
pub async fn maid(
    ctx: Context,
    Path(id): Path<user::Id>,
) -> Result<Json<User>, Error> {
    define_error! {
        enum MaidError {
            #[code = "MAID_NOT_EXISTS"]
            #[status = NOT_FOUND]
            #[message = "Maid with the provided ID does not exist"]
            MaidNotExists,
        }
    }

    ctx.service()
        .execute(query::user::ById::by(id))
        .await
        .map_err(AsError::into_error)?
        .filter(domain::User::is_active_maid)
        .ok_or_else(|| MaidError::MaidNotExists.into())
        .map(|u| Json(u.into()))
}

/// Lists all the registered `User`s, newest first.
///
/// # Errors
///
/// Possible error codes:
/// - `AUTHORIZATION_REQUIRED` - the request is not authenticated;
/// - `FORBIDDEN` - the authenticated `User` is not an administrator;
/// - `INVALID_FIELDS` - the `role` filter is unknown.
#[tracing::instrument(
    skip_all,
    fields(api.name = "users", otel.name = api::SPAN_NAME, role = ?filter.role),
)]
pub async fn list(
    ctx: Context,
    Query(filter): Query<Filter>,
) -> Result<Json<Vec<User>>, Error> {
    _ = ctx.session_that(|c| c.manage_users).await?;

    let mut v = Validation::new();
    let role = non_blank(filter.role).map(|r| {
        v.check(
            "role",
            r.to_uppercase().parse::<user::Role>().ok(),
            "must be one of `CLIENT`, `MAID` or `ADMIN`",
        )
    });
    v.finish()?;

    ctx.service()
        .execute(query::user::ListActive::by(read::user::Active {
            role: role.flatten(),
        }))
        .await
        .map_err(AsError::into_error)
        .map(|users| Json(users.into_iter().map(Into::into).collect()))
}

impl AsError for command::update_user_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Provided email is occupied by another `User`"]
                EmailOccupied,

                #[code = "INVALID_TOKEN"]
                #[status = UNAUTHORIZED]
                #[message = "Authorization token is invalid or expired"]
                InvalidToken,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::EmailOccupied(_) => Error::EmailOccupied.into(),
            Self::UserNotExists(_) => Error::InvalidToken.into(),
        })
    }
}

impl AsError for command::update_maid_rate::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_TOKEN"]
                #[status = UNAUTHORIZED]
                #[message = "Authorization token is invalid or expired"]
                InvalidToken,

                #[code = "NON_POSITIVE_HOURLY_RATE"]
                #[status = BAD_REQUEST]
                #[message = "Hourly rate must be positive"]
                NonPositiveHourlyRate,

                #[code = "NOT_MAID"]
                #[status = FORBIDDEN]
                #[message = "Only maids charge an hourly rate"]
                NotMaid,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::Rate(user::RateError::NonPositive(_)) => {
                Error::NonPositiveHourlyRate.into()
            }
            Self::Rate(user::RateError::NotMaid(_)) => Error::NotMaid.into(),
            Self::UserNotExists(_) => Error::InvalidToken.into(),
        })
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ADMIN_REGISTRATION"]
                #[status = FORBIDDEN]
                #[message = "`ADMIN` users cannot be registered"]
                AdminRegistration,

                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "Provided email is occupied by another `User`"]
                EmailOccupied,

                #[code = "HOURLY_RATE_REQUIRED"]
                #[status = BAD_REQUEST]
                #[message = "`MAID` users must provide an hourly rate"]
                HourlyRateRequired,

                #[code = "NON_POSITIVE_HOURLY_RATE"]
                #[status = BAD_REQUEST]
                #[message = "Hourly rate must be positive"]
                NonPositiveHourlyRate,
            }
        }

        Some(match self {
            Self::AdminRegistration => Error::AdminRegistration.into(),
            Self::Db(e) => return e.try_as_error(),
            Self::EmailOccupied(_) => Error::EmailOccupied.into(),
            Self::HourlyRateRequired => Error::HourlyRateRequired.into(),
            Self::NonPositiveHourlyRate(_) => {
                Error::NonPositiveHourlyRate.into()
            }
        })
    }
}

impl AsError for create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = UNAUTHORIZED]
                #[message = "Provided credentials does not match any `User`"]
                WrongCredentials,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::user;

    use crate::error::Validation;

    use super::{ProfilePatch, Registration};

    fn form(json: &str) -> Registration {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn joins_first_and_last_names() {
        let f = form(
            r#"{"firstName":" Jane ","lastName":"Doe",
                "email":"jane@example.com","password":"secret1"}"#,
        );

        assert_eq!(f.full_name().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn prefers_full_name() {
        let f = form(
            r#"{"name":"J. Doe","firstName":"Jane",
                "email":"jane@example.com","password":"secret1"}"#,
        );

        assert_eq!(f.full_name().as_deref(), Some("J. Doe"));
    }

    #[test]
    fn accepts_legacy_phone_field() {
        let f = form(
            r#"{"name":"Jane","phoneNumber":"555-0101",
                "email":"jane@example.com","password":"secret1"}"#,
        );

        assert_eq!(f.phone.as_deref(), Some("555-0101"));
    }

    fn patch(json: &str) -> ProfilePatch {
        serde_json::from_str(json).unwrap()
    }

    fn fields(v: Validation) -> Vec<&'static str> {
        v.finish().map_or_else(
            |e| e.fields.iter().map(|f| f.field).collect(),
            |()| vec![],
        )
    }

    #[test]
    fn patches_only_provided_details() {
        let id = user::Id::new();
        let mut v = Validation::new();

        let cmd = patch(r#"{"firstName":"Jane","lastName":"Roe"}"#)
            .parse(id, &mut v);

        assert!(fields(v).is_empty());
        assert_eq!(cmd.user_id, id);
        assert_eq!(cmd.name.map(|n| n.to_string()).as_deref(), Some("Jane Roe"));
        assert!(cmd.email.is_none());
        assert!(cmd.phone.is_none());
    }

    #[test]
    fn removes_phone_on_null() {
        let mut v = Validation::new();

        let cmd = patch(r#"{"phoneNumber":null}"#).parse(user::Id::new(), &mut v);

        assert!(fields(v).is_empty());
        assert_eq!(cmd.phone, Some(None));
    }

    #[test]
    fn validates_profile_details() {
        let mut v = Validation::new();

        _ = patch(r#"{"name":" ","email":"jane@","phone":"12"}"#)
            .parse(user::Id::new(), &mut v);

        assert_eq!(fields(v), ["name", "email", "phone"]);
    }

    #[test]
    fn refuses_unknown_profile_fields() {
        assert!(serde_json::from_str::<ProfilePatch>(r#"{"role":"ADMIN"}"#)
            .is_err());
    }
}
