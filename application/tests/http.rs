//! REST API behavior not reaching the database.

use application::Config;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt as _;
use serde_json::{json, Value};
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tower::ServiceExt as _;

fn app() -> Router {
    let conf = Config::default();
    let postgres = Postgres::new(&postgres::Config::from(conf.postgres))
        .expect("lazy pool");
    application::app(Service::new(conf.service.into(), postgres))
}

async fn call(req: Request<Body>) -> (StatusCode, Value) {
    let resp = app().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn invalid_fields(body: &Value) -> Vec<&str> {
    body["fields"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|f| f["field"].as_str())
        .collect()
}

#[tokio::test]
async fn estimates_legacy_job() {
    let (status, body) = call(json_request(
        "POST",
        "/api/quotations/estimate",
        &json!({
            "serviceType": "DEEP_CLEANING",
            "propertyType": "HOUSE",
            "bedrooms": 3,
            "bathrooms": 2,
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["estimatedDuration"], 330);
    assert_eq!(
        body["estimatedPrice"],
        json!({"amount": "297.00", "currency": "USD"}),
    );
    assert_eq!(body["summary"]["subtotal"]["amount"], "297.00");
    assert_eq!(body["summary"]["vat"]["amount"], "20.79");
    assert_eq!(body["summary"]["total"]["amount"], "317.79");
}

#[tokio::test]
async fn refuses_mixed_selection() {
    let (status, body) = call(json_request(
        "POST",
        "/api/quotations/estimate",
        &json!({
            "serviceType": "DEEP_CLEANING",
            "serviceIds": ["6a2f41a3-c54c-fce8-32d2-0324e1c32e22"],
            "cityCode": "NYC",
            "tenantId": 1,
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
    assert_eq!(body["code"], "INVALID_FIELDS");
    assert_eq!(invalid_fields(&body), ["serviceType"]);
}

#[tokio::test]
async fn requires_authorization_for_profile() {
    let req = Request::get("/api/auth/me").body(Body::empty()).unwrap();

    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHORIZED");
    assert_eq!(body["code"], "AUTHORIZATION_REQUIRED");
}

#[tokio::test]
async fn refuses_malformed_token() {
    let req = Request::get("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn refuses_guest_with_unrecognized_contact() {
    let (status, body) = call(json_request(
        "POST",
        "/api/quotations",
        &json!({
            "customerName": "Jane",
            "contact": "call me maybe",
            "serviceType": "GENERAL_CLEANING",
            "zipcode": "10001",
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid_fields(&body), ["contact"]);
}

#[tokio::test]
async fn requires_guest_contact_and_zipcode() {
    let (status, body) = call(json_request(
        "POST",
        "/api/quotations",
        &json!({"customerName": "Jane", "serviceType": "GENERAL_CLEANING"}),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid_fields(&body), ["contact", "zipcode"]);
}

#[tokio::test]
async fn refuses_unknown_patch_fields() {
    let (status, body) = call(json_request(
        "PATCH",
        "/api/quotations/6a2f41a3-c54c-fce8-32d2-0324e1c32e22",
        &json!({"status": "ACCEPTED"}),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn requires_catalog_scope() {
    let req = Request::get("/api/service-catalog?tenantId=1")
        .body(Body::empty())
        .unwrap();

    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid_fields(&body), ["cityCode"]);
}

#[tokio::test]
async fn refuses_malformed_credentials_uniformly() {
    let (status, body) = call(json_request(
        "POST",
        "/api/auth/login",
        &json!({"email": "not-an-email", "password": "secret1"}),
    ))
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "WRONG_CREDENTIALS");
}

#[tokio::test]
async fn validates_registration_form() {
    let (status, body) = call(json_request(
        "POST",
        "/api/auth/register",
        &json!({
            "firstName": " ",
            "email": "jane@example.com",
            "password": "short",
            "role": "JANITOR",
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid_fields(&body), ["name", "password", "role"]);
}

#[tokio::test]
async fn requires_authorization_for_bookings() {
    let (status, body) = call(json_request(
        "POST",
        "/api/bookings",
        &json!({
            "maidId": "6a2f41a3-c54c-fce8-32d2-0324e1c32e22",
            "startTime": "2025-06-02T09:00:00Z",
            "duration": 120,
        }),
    ))
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHORIZATION_REQUIRED");
}

#[tokio::test]
async fn refuses_quotation_patch_with_malformed_token() {
    let mut req = json_request(
        "PATCH",
        "/api/quotations/6a2f41a3-c54c-fce8-32d2-0324e1c32e22",
        &json!({"bedrooms": 2}),
    );
    _ = req.headers_mut().insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Bearer not-a-jwt"),
    );

    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn requires_authorization_for_users_list() {
    let req = Request::get("/api/users?role=MAID").body(Body::empty()).unwrap();

    let (status, body) = call(req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHORIZATION_REQUIRED");
}

#[tokio::test]
async fn refuses_unknown_profile_fields() {
    let (status, body) = call(json_request(
        "PATCH",
        "/api/auth/profile",
        &json!({"role": "ADMIN"}),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
}

#[tokio::test]
async fn requires_authorization_for_profile_update() {
    let (status, body) = call(json_request(
        "PUT",
        "/api/users/profile",
        &json!({"name": "Jane Roe"}),
    ))
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTHORIZATION_REQUIRED");
}

#[tokio::test]
async fn refuses_malformed_hourly_rate() {
    let (status, body) = call(json_request(
        "PUT",
        "/api/users/maid-profile",
        &json!({"hourlyRate": "a lot"}),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION");
}
