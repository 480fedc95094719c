use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};
use zeroize::Zeroizing;

use crate::crypto::credential::PasswordScheme;
use crate::crypto::token::DEFAULT_TTL_DAYS;

/// Longest token lifetime accepted from `TOKEN_TTL_DAYS`.
pub const MAX_TOKEN_TTL_DAYS: i64 = 365;

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database. `None` selects the in-memory user store.
    pub database_url: Option<String>,
    /// The shared secret used to sign tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// The lifetime of an issued token in days.
    pub token_ttl_days: i64,
    /// How newly stored credentials are derived.
    pub password_scheme: PasswordScheme,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Whether the process runs with `APP_ENV=production`.
    pub is_production: bool,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` reading each variable through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_production = lookup("APP_ENV").as_deref() == Some("production");

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => Zeroizing::new(secret.into_bytes()),
            _ if is_production => {
                anyhow::bail!("JWT_SECRET must be set to a non-empty value in production")
            }
            _ => {
                tracing::warn!("⚠️  JWT_SECRET is not set; tokens are signed with an empty secret");
                Zeroizing::new(Vec::new())
            }
        };

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => Some(url),
            None if is_production => anyhow::bail!("DATABASE_URL must be set in production"),
            None => {
                tracing::warn!("⚠️  DATABASE_URL is not set; using the in-memory user store");
                None
            }
        };

        let token_ttl_days: i64 = lookup("TOKEN_TTL_DAYS")
            .unwrap_or_else(|| DEFAULT_TTL_DAYS.to_string())
            .parse()
            .context("Invalid TOKEN_TTL_DAYS")?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            anyhow::bail!("TOKEN_TTL_DAYS must be between 1 and {}", MAX_TOKEN_TTL_DAYS);
        }

        let password_scheme = lookup("PASSWORD_SCHEME")
            .unwrap_or_else(|| "sha256".to_string())
            .parse::<PasswordScheme>()
            .map_err(anyhow::Error::msg)
            .context("Invalid PASSWORD_SCHEME")?;

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .context("Invalid BIND_ADDR")?;

        Ok(Self {
            database_url,
            jwt_secret,
            token_ttl_days,
            password_scheme,
            bind_addr,
            is_production,
        })
    }
}
