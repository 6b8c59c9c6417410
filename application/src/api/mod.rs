//! REST API definitions.

pub mod booking;
pub mod catalog;
pub mod quotation;
pub mod user;

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Error;

/// Name of the [`tracing::Span`] for the API handlers.
const SPAN_NAME: &str = "REST API call";

/// Returns the [`Router`] of the whole REST API.
pub fn router() -> Router {
    Router::new()
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/me", get(user::me))
        .route("/auth/profile", patch(user::update_profile))
        .route("/users", get(user::list))
        .route(
            "/users/profile",
            get(user::me).put(user::update_profile),
        )
        .route("/users/maid-profile", put(user::update_maid_profile))
        .route("/users/maid/:id", get(user::maid))
        .route("/service-catalog", get(catalog::offered))
        .route("/quotations", post(quotation::create).get(quotation::list))
        .route("/quotations/estimate", post(quotation::estimate))
        .route("/quotations/admin/pending", get(quotation::list_pending))
        .route(
            "/quotations/:id",
            get(quotation::get).patch(quotation::update),
        )
        .route("/quotations/:id/accept", post(quotation::accept))
        .route("/quotations/:id/reject", post(quotation::reject))
        .route("/bookings", post(booking::create).get(booking::list))
        .route("/bookings/:id", get(booking::get))
        .route("/bookings/:id/status", patch(booking::update_status))
        .route("/bookings/:id/cancel", post(booking::cancel))
}

/// JSON body, rejected with an [`Error`].
#[derive(Clone, Copy, Debug, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameters, rejected with an [`Error`].
#[derive(Clone, Copy, Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// Query string, rejected with an [`Error`].
#[derive(Clone, Copy, Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// Deserializes a field, telling an explicit `null` apart from a missing
/// one (which is left to `#[serde(default)]`).
pub(crate) fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Trims the provided text, dropping it if blank.
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod spec {
    use serde::Deserialize;

    use super::{non_blank, nullable};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, deny_unknown_fields)]
    struct Patch {
        #[serde(deserialize_with = "nullable")]
        city: Option<Option<String>>,
    }

    #[test]
    fn tells_null_from_missing() {
        let parse = |s| serde_json::from_str::<Patch>(s).unwrap().city;

        assert_eq!(parse("{}"), None);
        assert_eq!(parse(r#"{"city":null}"#), Some(None));
        assert_eq!(parse(r#"{"city":"Austin"}"#), Some(Some("Austin".into())));
    }

    #[test]
    fn drops_blank_text() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(Some(" a ".into())), Some("a".into()));
        assert_eq!(non_blank(None), None);
    }
}
