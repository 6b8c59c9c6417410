//! [`Query`] collection related to [`Booking`]s.

use common::operations::By;

use crate::{
    domain::{user, Booking},
    read,
};
#[cfg(doc)]
use crate::{domain::User, Query};

use super::DatabaseQuery;

/// Queries a [`Booking`] a [`User`] takes part in.
pub type Involving = DatabaseQuery<By<Option<Booking>, read::booking::Involving>>;

/// Queries all the [`Booking`]s a [`User`] takes part in, by start time.
pub type ListInvolving = DatabaseQuery<By<Vec<Booking>, user::Id>>;
