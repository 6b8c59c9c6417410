//! [`Command`] for placing a new [`Quotation`].

use std::collections::HashMap;

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        catalog,
        pricing,
        quotation::{self, Location, Requestor, Selection},
        Quotation,
    },
    infra::{database, Database},
    Service,
};

use super::{estimate_quotation, Command, EstimateQuotation};

/// [`Command`] for placing a new [`Quotation`].
#[derive(Clone, Debug)]
pub struct CreateQuotation {
    /// [`Requestor`] of the new [`Quotation`].
    pub requestor: Requestor,

    /// Services requested.
    pub selection: Selection,

    /// Attributes of the property to be cleaned.
    pub attributes: pricing::Attributes,

    /// [`Location`] of the property to be cleaned.
    pub location: Location,

    /// [`quotation::Frequency`] of the job, if already chosen.
    pub frequency: Option<quotation::Frequency>,

    /// Free-form requirements of the customer.
    pub special_requirements: Option<String>,

    /// [`Date`] the customer prefers the job to be done on.
    pub preferred_date: Option<Date>,

    /// Time of day the customer prefers.
    pub preferred_time: Option<String>,
}

impl<Db> Command<CreateQuotation> for Service<Db>
where
    Db: Database<
            Select<By<HashMap<catalog::Id, catalog::Entry>, Vec<catalog::Id>>>,
            Ok = HashMap<catalog::Id, catalog::Entry>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Quotation>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Quotation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateQuotation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateQuotation {
            requestor,
            selection,
            attributes,
            location,
            frequency,
            special_requirements,
            preferred_date,
            preferred_time,
        } = cmd;

        let estimate_quotation::Output { estimate, .. } = self
            .execute(EstimateQuotation {
                selection: selection.clone(),
                attributes: attributes.clone(),
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let quotation = Quotation {
            id: quotation::Id::new(),
            requestor,
            selection,
            attributes,
            location,
            frequency,
            estimated_duration: estimate.duration,
            estimated_price: estimate.price,
            special_requirements,
            preferred_date,
            preferred_time,
            status: quotation::Status::Pending,
            provider_id: None,
            valid_until: (now + self.config().quotation_validity).coerce(),
            created_at: now.coerce(),
            updated_at: now.coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(quotation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tracing::info!(
            quotation_id = %quotation.id,
            guest = matches!(quotation.requestor, Requestor::Guest(_)),
            "quotation placed",
        );

        Ok(quotation)
    }
}

/// Error of [`CreateQuotation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`EstimateQuotation`] failed.
    #[display("Failed to estimate `Quotation`: {_0}")]
    Estimation(estimate_quotation::ExecutionError),
}
