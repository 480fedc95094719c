use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::claims::Claims,
    services::auth as auth_service,
    state::AppState,
    validation::auth::{Registration, parse_role, present},
};

/// The request body accepted by `POST /api/auth`.
///
/// `action` selects `register`, `login` or `verify`; the other fields are read per action.
#[derive(Deserialize, Default)]
pub struct AuthRequest {
    pub action: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub token: Option<String>,
}

/// The response payload for a successful `verify`.
#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: Claims,
}

fn parse_body(body: &[u8]) -> Result<AuthRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthRequest::default());
    }
    sonic_rs::from_slice(body).map_err(|e| {
        tracing::debug!("Rejected auth body: {}", e);
        AppError::Validation("Invalid JSON body".to_string())
    })
}

/// Handles `POST /api/auth`, dispatching on the `action` field.
#[axum::debug_handler]
pub async fn auth(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request = parse_body(&body)?;

    match request.action.as_deref() {
        Some("register") => register(&state, request).await,
        Some("login") => login(&state, request).await,
        Some("verify") => verify(&state, request),
        other => {
            tracing::debug!("Unknown auth action: {:?}", other);
            Err(AppError::Validation("Invalid action".to_string()))
        }
    }
}

async fn register(state: &AppState, request: AuthRequest) -> Result<Response> {
    let (Some(email), Some(password), Some(full_name)) = (
        present(request.email.as_deref()),
        request.password.as_deref().filter(|p| !p.is_empty()),
        present(request.full_name.as_deref()),
    ) else {
        return Err(AppError::Validation(
            "Email, password and full_name are required".to_string(),
        ));
    };
    let role = parse_role(request.role.as_deref())?;

    tracing::info!("📝 Register attempt: {}", email);

    let outcome = auth_service::register(
        state,
        Registration {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
            phone: request.phone.clone().unwrap_or_default(),
            role,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome)).into_response())
}

async fn login(state: &AppState, request: AuthRequest) -> Result<Response> {
    let (Some(email), Some(password)) = (
        present(request.email.as_deref()),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    };

    tracing::info!("🔐 Login attempt: {}", email);

    let outcome = auth_service::login(state, email, password).await?;
    Ok((StatusCode::OK, Json(outcome)).into_response())
}

fn verify(state: &AppState, request: AuthRequest) -> Result<Response> {
    let token = present(request.token.as_deref())
        .ok_or_else(|| AppError::Validation("Token is required".to_string()))?;

    let claims = auth_service::verify_token(state, token)?;
    let response = VerifyResponse {
        valid: true,
        user: claims,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Rejects methods other than `POST` on `/api/auth` with a JSON error.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Handles `GET /api/auth/me`, returning the claims attached by `require_auth`.
pub async fn me(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_default_request() {
        let request = parse_body(b"").unwrap();
        assert!(request.action.is_none());
        let request = parse_body(b"  \n").unwrap();
        assert!(request.action.is_none());
    }

    #[test]
    fn test_invalid_json_is_validation_error() {
        let err = parse_body(b"{not json").err().unwrap();
        assert!(matches!(err, AppError::Validation(ref msg) if msg == "Invalid JSON body"));
    }

    #[test]
    fn test_body_fields_are_read() {
        let request =
            parse_body(br#"{"action":"login","email":"a@b.com","password":"pw"}"#).unwrap();
        assert_eq!(request.action.as_deref(), Some("login"));
        assert_eq!(request.email.as_deref(), Some("a@b.com"));
        assert!(request.token.is_none());
    }
}
