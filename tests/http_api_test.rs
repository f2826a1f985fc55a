mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{TestApp, VariantSpec};
use http_body_util_shim::collect_body;
use nutriline_api::entities::UserRole;
use serde_json::Value;
use tower::ServiceExt;

/// Minimal body collector so the suite does not need an extra dependency.
mod http_body_util_shim {
    use axum::body::Body;
    use futures::StreamExt;

    pub async fn collect_body(body: Body) -> Vec<u8> {
        let mut stream = body.into_data_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.expect("body chunk"));
        }
        bytes
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn test_cards_endpoint_is_public() {
    let app = TestApp::new().await;
    let router = app.router();

    let response = router
        .oneshot(get("/api/v1/payment/test-cards"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = collect_body(response.into_body()).await;
    let cards: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(cards.as_array().expect("array").len(), 3);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn cart_requires_a_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .router()
        .oneshot(get("/api/v1/cart"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let user_id = app.seed_user(UserRole::Customer).await;
    let token = app.token_for(user_id).await;

    let response = app
        .router()
        .oneshot(get_with_token("/api/v1/cart", &token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = collect_body(response.into_body()).await;
    let cart: Value = serde_json::from_slice(&body).expect("json body");
    assert_eq!(cart["summary"]["item_count"], 0);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn admin_routes_reject_customers() {
    let app = TestApp::new().await;
    let customer = app.seed_user(UserRole::Customer).await;
    let admin = app.seed_user(UserRole::Admin).await;

    let customer_token = app.token_for(customer).await;
    let response = app
        .router()
        .oneshot(get_with_token("/api/v1/admin/orders", &customer_token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin_token = app.token_for(admin).await;
    let response = app
        .router()
        .oneshot(get_with_token("/api/v1/admin/orders", &admin_token))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn register_then_login_roundtrip() {
    let app = TestApp::new().await;

    let register = Request::builder()
        .method(Method::POST)
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "email": "lifter@example.com",
                "password": "super-secret-1",
                "full_name": "Jo Lifter",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.router().oneshot(register).await.expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let bad_login = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "email": "lifter@example.com",
                "password": "wrong-password",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.router().oneshot(bad_login).await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let login = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({
                "email": "lifter@example.com",
                "password": "super-secret-1",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.router().oneshot(login).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = collect_body(response.into_body()).await;
    let auth: Value = serde_json::from_slice(&body).expect("json body");
    assert!(auth["token"].as_str().is_some());
    assert!(auth["user"]["password_hash"].is_null(), "hash never leaves");
}

#[tokio::test]
#[cfg_attr(not(feature = "db-tests"), ignore)]
async fn storefront_listing_hides_inactive_products() {
    let app = TestApp::new().await;
    let active = app.seed_product(None, true).await;
    let inactive = app.seed_product(None, false).await;
    app.seed_variant(VariantSpec {
        product_id: Some(active),
        ..Default::default()
    })
    .await;

    let response = app
        .router()
        .oneshot(get("/api/v1/products"))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let body = collect_body(response.into_body()).await;
    let page: Value = serde_json::from_slice(&body).expect("json body");
    let ids: Vec<&str> = page["data"]
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["id"].as_str().expect("id"))
        .collect();
    assert!(ids.contains(&active.to_string().as_str()));
    assert!(!ids.contains(&inactive.to_string().as_str()));
}
