//! [`Command`] for accepting a [`Quotation`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{quotation, user, Quotation, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for accepting a [`Quotation`] and assigning a provider to it.
#[derive(Clone, Copy, Debug)]
pub struct AcceptQuotation {
    /// ID of the [`Quotation`] to accept.
    pub quotation_id: quotation::Id,

    /// ID of the customer accepting the [`Quotation`].
    pub customer_id: user::Id,

    /// ID of the [`user::Role::Maid`] to do the job.
    pub provider_id: user::Id,
}

impl<Db> Command<AcceptQuotation> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Quotation, quotation::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Quotation>, quotation::Id>>,
            Ok = Option<Quotation>,
            Err = Traced<database::Error>,
        > + Database<Update<Quotation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Quotation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AcceptQuotation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AcceptQuotation {
            quotation_id,
            customer_id,
            provider_id,
        } = cmd;

        let provider = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(provider_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.deleted_at.is_none())
            .ok_or(E::ProviderNotExists(provider_id))
            .map_err(tracerr::wrap!())?;
        if !provider.role.capabilities().provide_services {
            return Err(tracerr::new!(E::NotProvider(provider_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent decisions.
        tx.execute(Lock(By::new(quotation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut quotation = tx
            .execute(Select(By::<Option<Quotation>, _>::new(quotation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|q| q.is_decidable_by(customer_id))
            .ok_or(E::QuotationNotExists(quotation_id))
            .map_err(tracerr::wrap!())?;

        quotation
            .accept(DateTime::now(), customer_id, provider.id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(quotation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            %quotation_id,
            %customer_id,
            %provider_id,
            "quotation accepted",
        );

        Ok(quotation)
    }
}

/// Error of [`AcceptQuotation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] assigned as a provider cannot provide services.
    #[display("`User(id: {_0})` is not a service provider")]
    #[from(ignore)]
    NotProvider(#[error(not(source))] user::Id),

    /// Provider [`User`] does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    ProviderNotExists(#[error(not(source))] user::Id),

    /// [`Quotation`] with the provided ID does not exist, or belongs to
    /// another customer.
    #[display("`Quotation(id: {_0})` does not exist")]
    #[from(ignore)]
    QuotationNotExists(#[error(not(source))] quotation::Id),

    /// [`Quotation`] cannot be accepted anymore.
    #[display("{_0}")]
    Transition(quotation::TransitionError),
}
