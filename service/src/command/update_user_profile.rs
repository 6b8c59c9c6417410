//! [`Command`] for updating contact details of a [`User`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating contact details of a [`User`].
///
/// [`None`] leaves a detail untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateUserProfile {
    /// ID of the [`User`] to update.
    pub user_id: user::Id,

    /// New [`user::Name`] of the [`User`].
    pub name: Option<user::Name>,

    /// New [`user::Email`] of the [`User`].
    pub email: Option<user::Email>,

    /// New [`user::Phone`] of the [`User`], `Some(None)` removing it.
    pub phone: Option<Option<user::Phone>>,
}

impl<Db> Command<UpdateUserProfile> for Service<Db>
where
    Db: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<User, user::Id>>, Err = Traced<database::Error>>
        + Database<Update<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserProfile,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserProfile {
            user_id,
            name,
            email,
            phone,
        } = cmd;

        if let Some(email) = &email {
            let holder = self
                .database()
                .execute(Select(By::new(email)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            if holder.is_some_and(|u| u.id != user_id) {
                return Err(tracerr::new!(E::EmailOccupied(email.clone())));
            }
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.deleted_at.is_none())
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let mut changed = false;
        if let Some(name) = name.filter(|n| *n != user.name) {
            user.name = name;
            changed = true;
        }
        if let Some(email) = email.filter(|e| *e != user.email) {
            user.email = email;
            changed = true;
        }
        if let Some(phone) = phone.filter(|p| *p != user.phone) {
            user.phone = phone;
            changed = true;
        }
        if !changed {
            return Ok(user);
        }

        let updated = tx.execute(Update(user.clone())).await;
        if let Err(e) = &updated {
            // Concurrent registration or update with the same email.
            if e.as_ref().is_unique_violation(Some("users_email_key")) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
        }
        updated.map_err(tracerr::map_from_and_wrap!(=> E)).map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`UpdateUserProfile`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Email`] is occupied by another [`User`].
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
