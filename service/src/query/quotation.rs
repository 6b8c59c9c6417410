//! [`Query`] collection related to [`Quotation`]s.

use common::operations::By;

use crate::{
    domain::{user, Quotation},
    read,
};
#[cfg(doc)]
use crate::{domain::User, Query};

use super::DatabaseQuery;

/// Queries a [`Quotation`] owned by a [`User`].
pub type OwnedBy = DatabaseQuery<By<Option<Quotation>, read::quotation::OwnedBy>>;

/// Queries all the [`Quotation`]s owned by a [`User`], newest first.
pub type ListOwnedBy = DatabaseQuery<By<Vec<Quotation>, user::Id>>;

/// Queries all the [`Quotation`]s awaiting a decision, oldest first.
pub type ListPending = DatabaseQuery<By<Vec<Quotation>, read::quotation::Pending>>;
