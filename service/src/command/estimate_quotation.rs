//! [`Command`] for estimating a [`Quotation`] before or after it's placed.
//!
//! [`Quotation`]: crate::domain::Quotation

use std::collections::HashMap;

use common::{
    money::CurrencyMismatch,
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        catalog::{self, Category},
        pricing::{self, Estimate},
        quotation::Selection,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for estimating the duration and price of a cleaning job.
#[derive(Clone, Debug)]
pub struct EstimateQuotation {
    /// Services to estimate.
    pub selection: Selection,

    /// Attributes of the property to be cleaned.
    pub attributes: pricing::Attributes,
}

/// Output of [`EstimateQuotation`] [`Command`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Output {
    /// Estimated duration and price.
    pub estimate: Estimate,

    /// Quote summary of the estimated price, if any.
    pub summary: Option<pricing::Summary>,
}

impl<Db> Command<EstimateQuotation> for Service<Db>
where
    Db: Database<
        Select<By<HashMap<catalog::Id, catalog::Entry>, Vec<catalog::Id>>>,
        Ok = HashMap<catalog::Id, catalog::Entry>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: EstimateQuotation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let EstimateQuotation {
            selection,
            attributes,
        } = cmd;
        let policy = &self.config().pricing;

        let duration = policy.duration(&attributes);
        let price = match selection {
            Selection::Legacy(ty) => Some(policy.legacy_price(
                ty,
                attributes.property_type,
                duration,
            )),
            Selection::Catalog {
                scope,
                main,
                extras,
            } => {
                if main.is_empty() {
                    return Err(tracerr::new!(E::NoMainService));
                }

                let ids = main.iter().chain(&extras).copied().collect();
                let entries = self
                    .database()
                    .execute(Select(By::new(ids)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;

                let now = DateTime::now();
                let resolve = |id: &catalog::Id, category: Category| {
                    let entry = entries
                        .get(id)
                        .filter(|e| e.is_eligible(now, &scope))
                        .ok_or(E::ServiceNotOffered(*id))?;
                    if entry.category == category {
                        Ok(entry)
                    } else {
                        Err(E::WrongCategory {
                            id: *id,
                            expected: category,
                        })
                    }
                };
                let main = main
                    .iter()
                    .map(|id| resolve(id, Category::Main))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(tracerr::wrap!())?;
                let extras = extras
                    .iter()
                    .map(|id| resolve(id, Category::Extra))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(tracerr::wrap!())?;

                policy
                    .catalog_price(&attributes, main, extras)
                    .map_err(tracerr::from_and_wrap!(=> E))?
            }
        };

        Ok(Output {
            estimate: Estimate { duration, price },
            summary: price
                .map(|p| pricing::Summary::new(p, self.config().vat)),
        })
    }
}

/// Error of [`EstimateQuotation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Selected services are priced in different currencies.
    #[display("Services are priced in different currencies: {_0}")]
    CurrencyMismatch(CurrencyMismatch),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// No main service is selected.
    #[display("At least one main service must be selected")]
    NoMainService,

    /// Selected service is unknown or not offered in the chosen scope now.
    #[display("Service `{_0}` is not offered")]
    #[from(ignore)]
    ServiceNotOffered(#[error(not(source))] catalog::Id),

    /// Selected service is of a wrong [`Category`].
    #[display("Service `{id}` is not a {expected} service")]
    #[from(ignore)]
    WrongCategory {
        /// ID of the service.
        #[error(not(source))]
        id: catalog::Id,

        /// Expected [`Category`] of the service.
        expected: Category,
    },
}
