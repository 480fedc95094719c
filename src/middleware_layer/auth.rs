use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

/// The header the web client sends its token in.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Extracts the bearer token from `X-Auth-Token` or `Authorization: Bearer`.
///
/// # Arguments
///
/// * `headers` - The request headers.
///
/// # Returns
///
/// An `Option` containing the token if found.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A middleware that requires a valid token to be present.
///
/// On success the token's `Claims` are inserted as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking authentication...");

    let Some(token) = extract_token(request.headers()) else {
        tracing::warn!("❌ No auth token found");
        return AppError::Authentication("Token is required".to_string()).into_response();
    };

    let Some(claims) = state.tokens.verify(token) else {
        return AppError::Authentication("Invalid or expired token".to_string()).into_response();
    };

    tracing::debug!("✅ User authenticated: {}", claims.user_id);

    request.extensions_mut().insert(claims);
    next.run(request).await
}
