//! Authentication service for the school/course-management app.
//!
//! Credentials are stored as derived digests and sessions are carried by
//! self-verifying HS256 bearer tokens; see [`crypto::token::TokenService`].

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{HeaderName, Method, header};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod db;
pub mod error;
pub mod state;

pub mod crypto {
    pub mod credential;
    pub mod token;
}

pub mod models {
    pub mod claims;
    pub mod user;
}

pub mod repositories {
    pub mod memory;
    pub mod user;
}

pub mod services {
    pub mod auth;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Request bodies larger than this are rejected.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// The CORS policy: any origin, preflight cached for a day.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(middleware_layer::auth::AUTH_TOKEN_HEADER),
        ])
        .max_age(Duration::from_secs(86400))
}

/// Builds the HTTP router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route(
            "/api/auth",
            post(handlers::auth::auth).fallback(handlers::auth::method_not_allowed),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
}
