use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::claims::Claims;
use crate::models::user::{NewUser, PublicUser, User};
use crate::state::AppState;
use crate::validation::auth::{Registration, validate_registration};

/// A freshly issued token together with the public view of its user.
#[derive(Serialize, Debug)]
pub struct AuthOutcome {
    pub token: String,
    pub user: PublicUser,
}

fn issue_for(state: &AppState, user: &User) -> Result<AuthOutcome> {
    let token = state
        .tokens
        .issue(user.id, &user.email, user.role)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;

    Ok(AuthOutcome {
        token,
        user: PublicUser::from(user),
    })
}

/// Creates a new user and issues their first token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `registration` - The validated-on-entry registration input.
///
/// # Returns
///
/// A `Result` containing the token and the created user.
pub async fn register(state: &AppState, registration: Registration) -> Result<AuthOutcome> {
    validate_registration(&registration)?;
    tracing::debug!("🔐 Creating user: {}", registration.email);

    match state.users.find_by_email(&registration.email).await {
        Ok(None) => {}
        // The email is taken even if its row is unusable here.
        Ok(Some(_)) | Err(AppError::UnsupportedRole { .. }) => {
            return Err(AppError::Conflict("User already exists".to_string()));
        }
        Err(e) => return Err(e),
    }

    let password_hash = state.credentials.hash(&registration.password)?;
    let user = state
        .users
        .create_user(NewUser {
            email: registration.email,
            password_hash,
            role: registration.role,
            full_name: registration.full_name,
            phone: registration.phone,
        })
        .await?;

    tracing::info!("✅ User registered: {} ({})", user.id, user.role);
    issue_for(state, &user)
}

/// Authenticates a user by email and password and issues a new token.
///
/// Legacy credentials are re-derived with the configured scheme on success.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<AuthOutcome> {
    tracing::debug!("🔐 Authenticating user: {}", email);

    let invalid = || AppError::Authentication("Invalid credentials".to_string());

    let user = state.users.find_by_email(email).await?.ok_or_else(invalid)?;
    if !state.credentials.verify(password, &user.password_hash)? {
        return Err(invalid());
    }

    if state.credentials.needs_rehash(&user.password_hash) {
        match state.credentials.hash(password) {
            Ok(upgraded) => match state.users.update_password_hash(user.id, &upgraded).await {
                Ok(()) => tracing::info!("🔑 Credential upgraded for user: {}", user.id),
                Err(e) => tracing::warn!("Credential upgrade failed for user {}: {}", user.id, e),
            },
            Err(e) => tracing::warn!("Credential upgrade failed for user {}: {}", user.id, e),
        }
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    issue_for(state, &user)
}

/// Verifies a bearer token and returns its claims.
///
/// Every failure is reported as the same authentication error.
pub fn verify_token(state: &AppState, token: &str) -> Result<Claims> {
    state
        .tokens
        .verify(token)
        .ok_or_else(|| AppError::Authentication("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::credential::{CredentialHasher, PasswordScheme, derive};
    use crate::crypto::token::TokenService;
    use crate::models::user::Role;
    use crate::repositories::memory::InMemoryUserRepository;
    use crate::repositories::user::UserRepository;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// A store whose only row carries a role this service does not know.
    struct LegacyRoleRepository;

    #[async_trait]
    impl UserRepository for LegacyRoleRepository {
        async fn find_by_email(&self, _email: &str) -> Result<Option<User>> {
            Err(AppError::UnsupportedRole {
                user_id: 9,
                role: "admin".to_string(),
            })
        }

        async fn create_user(&self, _new_user: NewUser) -> Result<User> {
            Err(AppError::Internal("unreachable in this test".to_string()))
        }

        async fn update_password_hash(&self, _user_id: i64, _password_hash: &str) -> Result<()> {
            Ok(())
        }
    }

    fn state_with(repo: InMemoryUserRepository, scheme: PasswordScheme) -> AppState {
        AppState::with_parts(
            Arc::new(repo),
            TokenService::new("unit-test-secret"),
            CredentialHasher::new(scheme),
        )
    }

    fn registration(email: &str, role: Role) -> Registration {
        Registration {
            email: email.to_string(),
            password: "hunter2".to_string(),
            full_name: "Ann Teacher".to_string(),
            phone: "+10000000000".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = state_with(InMemoryUserRepository::new(), PasswordScheme::Sha256);

        let registered = register(&state, registration("ann@school.org", Role::Teacher))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "ann@school.org");
        assert_eq!(registered.user.role, Role::Teacher);

        let claims = verify_token(&state, &registered.token).unwrap();
        assert_eq!(claims.user_id, registered.user.id);

        let logged_in = login(&state, "ann@school.org", "hunter2").await.unwrap();
        assert_eq!(logged_in.user, registered.user);
    }

    #[tokio::test]
    async fn test_register_stores_digest_not_plaintext() {
        let repo = InMemoryUserRepository::new();
        let state = state_with(repo.clone(), PasswordScheme::Sha256);
        register(&state, registration("ann@school.org", Role::Parent)).await.unwrap();

        let stored = repo.find_by_email("ann@school.org").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, derive("hunter2"));
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let state = state_with(InMemoryUserRepository::new(), PasswordScheme::Sha256);
        register(&state, registration("ann@school.org", Role::Parent)).await.unwrap();
        let err = register(&state, registration("ann@school.org", Role::Parent))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let state = state_with(InMemoryUserRepository::new(), PasswordScheme::Sha256);
        register(&state, registration("ann@school.org", Role::Parent)).await.unwrap();

        let wrong_password = login(&state, "ann@school.org", "hunter3").await.unwrap_err();
        assert!(matches!(wrong_password, AppError::Authentication(_)));

        let unknown_user = login(&state, "bob@school.org", "hunter2").await.unwrap_err();
        assert!(matches!(unknown_user, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_login_upgrades_legacy_credential() {
        let repo = InMemoryUserRepository::new();
        register(
            &state_with(repo.clone(), PasswordScheme::Sha256),
            registration("ann@school.org", Role::Parent),
        )
        .await
        .unwrap();

        let hardened = state_with(repo.clone(), PasswordScheme::Argon2id);
        login(&hardened, "ann@school.org", "hunter2").await.unwrap();

        let stored = repo.find_by_email("ann@school.org").await.unwrap().unwrap();
        assert!(stored.password_hash.starts_with("$argon2id$"));
        login(&hardened, "ann@school.org", "hunter2").await.unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_stored_role() {
        let state = AppState::with_parts(
            Arc::new(LegacyRoleRepository),
            TokenService::new("unit-test-secret"),
            CredentialHasher::new(PasswordScheme::Sha256),
        );

        let err = login(&state, "root@school.org", "hunter2").await.unwrap_err();
        assert!(matches!(err, AppError::UnsupportedRole { .. }));
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);

        let err = register(&state, registration("root@school.org", Role::Parent))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == "User already exists"));
    }

    #[test]
    fn test_verify_token_rejects_garbage() {
        let state = state_with(InMemoryUserRepository::new(), PasswordScheme::Sha256);
        let err = verify_token(&state, "not.a.token").unwrap_err();
        assert!(matches!(err, AppError::Authentication(ref msg) if msg == "Invalid or expired token"));
    }
}
