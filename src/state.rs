use std::sync::Arc;
use crate::config::Config;
use crate::crypto::credential::CredentialHasher;
use crate::crypto::token::TokenService;
use crate::error::Result;
use crate::repositories::memory::InMemoryUserRepository;
use crate::repositories::user::{PgUserRepository, UserRepository};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The user store.
    pub users: Arc<dyn UserRepository>,
    /// Issues and verifies bearer tokens.
    pub tokens: TokenService,
    /// Derives and checks stored credentials.
    pub credentials: CredentialHasher,
}

impl AppState {
    /// Creates a new `AppState` from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let users: Arc<dyn UserRepository> = match config.database_url.as_deref() {
            Some(url) => {
                let pool = crate::db::create_pool(url)?;
                tracing::info!("✅ PostgreSQL pool initialized");
                Arc::new(PgUserRepository::new(pool))
            }
            None => {
                tracing::info!("✅ In-memory user store initialized");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let tokens = TokenService::new(config.jwt_secret.to_vec()).with_ttl_days(config.token_ttl_days);
        tracing::info!("✅ Token service initialized (ttl {}s)", tokens.ttl_seconds());

        let credentials = CredentialHasher::new(config.password_scheme);
        tracing::info!("✅ Credential hasher initialized ({:?})", credentials.scheme());

        Ok(Self::with_parts(users, tokens, credentials))
    }

    /// Assembles an `AppState` from already-built parts.
    pub fn with_parts(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        credentials: CredentialHasher,
    ) -> Self {
        Self {
            users,
            tokens,
            credentials,
        }
    }
}
