//! [`Command`] for rejecting a [`Quotation`].

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{quotation, user, Quotation},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for rejecting a [`Quotation`].
#[derive(Clone, Copy, Debug)]
pub struct RejectQuotation {
    /// ID of the [`Quotation`] to reject.
    pub quotation_id: quotation::Id,

    /// ID of the customer rejecting the [`Quotation`].
    pub customer_id: user::Id,
}

impl<Db> Command<RejectQuotation> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
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
        cmd: RejectQuotation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RejectQuotation {
            quotation_id,
            customer_id,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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
            .reject(DateTime::now(), customer_id)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(quotation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(quotation)
    }
}

/// Error of [`RejectQuotation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Quotation`] with the provided ID does not exist, or belongs to
    /// another customer.
    #[display("`Quotation(id: {_0})` does not exist")]
    #[from(ignore)]
    QuotationNotExists(#[error(not(source))] quotation::Id),

    /// [`Quotation`] cannot be rejected anymore.
    #[display("{_0}")]
    Transition(quotation::TransitionError),
}
