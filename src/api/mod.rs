// API module - HTTP endpoints

pub mod credits;
pub mod dashboard;
pub mod emails;
pub mod extract;
pub mod health;
pub mod invite_codes;
pub mod middleware;
pub mod response;
pub mod usage_logs;
pub mod users;
pub mod waitlist;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use middleware::auth::require_admin;

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Builds the full application router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(invite_codes::router())
        .merge(users::router())
        .merge(credits::router())
        .merge(emails::router())
        .merge(usage_logs::router())
        .merge(waitlist::router())
        .merge(dashboard::router())
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(health::router())
        .nest(&state.config.api_prefix, protected)
        .layer(cors_layer(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
