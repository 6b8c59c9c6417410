//! [`User`] read model definitions.
//!
//! [`User`]: crate::domain::User

use crate::domain::user::Role;
#[cfg(doc)]
use crate::domain::User;

/// Selector of all the not deleted [`User`]s, newest first.
#[derive(Clone, Copy, Debug, Default)]
pub struct Active {
    /// [`Role`] the [`User`]s must have, if any.
    pub role: Option<Role>,
}
