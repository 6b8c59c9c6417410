//! Service catalog read model definitions.

use common::Date;

use crate::domain::catalog;

/// Selector of [`catalog::Entry`]es offered within a [`catalog::Scope`] on
/// the provided [`Date`].
#[derive(Clone, Debug)]
pub struct Offered {
    /// [`catalog::Scope`] of the entries.
    pub scope: catalog::Scope,

    /// [`Date`] the entries must be in season on.
    pub on: Date,
}
