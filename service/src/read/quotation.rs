//! [`Quotation`] read model definitions.
//!
//! [`Quotation`]: crate::domain::Quotation

use common::DateTime;

use crate::domain::{quotation, user};
#[cfg(doc)]
use crate::domain::{Quotation, User};

/// Selector of a [`Quotation`] owned by the provided [`User`].
#[derive(Clone, Copy, Debug)]
pub struct OwnedBy {
    /// ID of the [`Quotation`].
    pub id: quotation::Id,

    /// ID of the owning [`User`].
    pub owner_id: user::Id,
}

/// Selector of [`Quotation`]s still awaiting a decision at the provided
/// moment.
#[derive(Clone, Copy, Debug)]
pub struct Pending {
    /// Moment the [`Quotation`]s must not be expired at.
    pub at: DateTime,
}
