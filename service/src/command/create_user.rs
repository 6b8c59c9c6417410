//! [`Command`] for registering a new [`User`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,

    /// [`user::Role`] of a new [`User`].
    pub role: user::Role,

    /// Hourly rate of a new [`User`], required for [`user::Role::Maid`].
    pub hourly_rate: Option<Money>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            phone,
            role,
            hourly_rate,
        } = cmd;

        let hourly_rate = match (role, hourly_rate) {
            (user::Role::Admin, _) => {
                return Err(tracerr::new!(E::AdminRegistration));
            }
            (user::Role::Maid, None) => {
                return Err(tracerr::new!(E::HourlyRateRequired));
            }
            (user::Role::Maid | user::Role::Client, Some(rate))
                if rate.amount.is_sign_negative() || rate.is_zero() =>
            {
                return Err(tracerr::new!(E::NonPositiveHourlyRate(rate)));
            }
            (user::Role::Maid, Some(rate)) => Some(rate.round()),
            (user::Role::Client, _) => None,
        };

        let existing = self
            .database()
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let id = user::Id::new();
        let user = User {
            id,
            name,
            password_hash: user::PasswordHash::new(id, password.expose_secret()),
            email,
            phone,
            role,
            hourly_rate,
            created_at: DateTime::now().coerce(),
            deleted_at: None,
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let inserted = tx.execute(Insert(user.clone())).await;
        if let Err(e) = &inserted {
            // Concurrent registration with the same email.
            if e.as_ref().is_unique_violation(Some("users_email_key")) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
        }
        inserted.map_err(tracerr::map_from_and_wrap!(=> E)).map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`user::Role::Admin`]s cannot register themselves.
    #[display("`ADMIN` users cannot be registered")]
    AdminRegistration,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`user::Role::Maid`] registers without an hourly rate.
    #[display("`MAID` users require an hourly rate")]
    HourlyRateRequired,

    /// Hourly rate is zero or negative.
    #[display("Hourly rate must be positive, not {_0}")]
    NonPositiveHourlyRate(#[error(not(source))] Money),
}
