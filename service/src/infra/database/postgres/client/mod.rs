//! Postgres [`Database`] clients.
//!
//! [`Database`]: crate::infra::Database

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
