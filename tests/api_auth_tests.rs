//! Admin password and CORS checks on the protected API.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_protected_route_without_token() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/invite-codes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn test_protected_route_with_wrong_password() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/dashboard/stats")
                .header(header::AUTHORIZATION, "Bearer not-the-password")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Invalid password");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/waitlist")
                .header(header::AUTHORIZATION, format!("Basic {}", common::ADMIN_PASSWORD))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_api_prefix() {
    let mut config = common::test_config();
    config.api_prefix = "/admin".to_string();
    let app = common::create_test_app_with(config);

    let response = app
        .oneshot(
            common::authed("DELETE", "/admin/invite-codes?ids=preview-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/v1/invite-codes")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let app = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_root_describes_service() {
    let app = common::create_test_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["message"], "Invite Code Dashboard API");
}
