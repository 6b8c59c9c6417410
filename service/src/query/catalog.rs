//! [`Query`] collection related to the service catalog.

use common::operations::By;

use crate::{domain::catalog, read};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries [`catalog::Entry`]es offered within a [`catalog::Scope`] on some
/// day.
pub type Offered = DatabaseQuery<By<Vec<catalog::Entry>, read::catalog::Offered>>;
