//! [`Booking`] read model definitions.
//!
//! [`Booking`]: crate::domain::Booking

use crate::domain::{booking, user};
#[cfg(doc)]
use crate::domain::{Booking, User};

/// Selector of a [`Booking`] the provided [`User`] takes part in, either as a
/// client or as a provider.
#[derive(Clone, Copy, Debug)]
pub struct Involving {
    /// ID of the [`Booking`].
    pub id: booking::Id,

    /// ID of the [`User`].
    pub user_id: user::Id,
}
