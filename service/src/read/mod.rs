//! Read entities definitions.

pub mod booking;
pub mod catalog;
pub mod quotation;
pub mod user;
