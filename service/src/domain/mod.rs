//! Domain definitions.

pub mod booking;
pub mod catalog;
pub mod pricing;
pub mod quotation;
pub mod user;

pub use self::{booking::Booking, quotation::Quotation, user::User};
