//! [`Command`] definition.

pub mod accept_quotation;
pub mod authorize_user_session;
pub mod cancel_booking;
pub mod create_booking;
pub mod create_quotation;
pub mod create_user;
pub mod create_user_session;
pub mod estimate_quotation;
pub mod reject_quotation;
pub mod update_booking_status;
pub mod update_maid_rate;
pub mod update_quotation;
pub mod update_user_profile;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    accept_quotation::AcceptQuotation,
    authorize_user_session::AuthorizeUserSession,
    cancel_booking::CancelBooking, create_booking::CreateBooking,
    create_quotation::CreateQuotation, create_user::CreateUser,
    create_user_session::CreateUserSession,
    estimate_quotation::EstimateQuotation,
    reject_quotation::RejectQuotation,
    update_booking_status::UpdateBookingStatus,
    update_maid_rate::UpdateMaidRate, update_quotation::UpdateQuotation,
    update_user_profile::UpdateUserProfile,
};
