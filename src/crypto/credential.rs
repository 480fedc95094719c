use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{AppError, Result};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// How newly stored credentials are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Unsalted SHA-256, lowercase hex. Compatible with existing user rows.
    Sha256,
    /// Salted Argon2id in PHC string format.
    Argon2id,
}

impl FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(PasswordScheme::Sha256),
            "argon2id" | "argon2" => Ok(PasswordScheme::Argon2id),
            other => Err(format!("unknown password scheme: {}", other)),
        }
    }
}

/// Derives the legacy credential digest: SHA-256 over the raw bytes, lowercase hex.
///
/// Deterministic and unsalted. Identical plaintexts always map to the same digest.
pub fn derive(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// Checks `plaintext` against a legacy digest in constant time.
pub fn verify_digest(plaintext: &str, digest: &str) -> bool {
    derive(plaintext).as_bytes().ct_eq(digest.as_bytes()).into()
}

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-formatted hash.
fn hash_argon2(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Credential(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Credential(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Credential(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed with Argon2id");
    Ok(password_hash)
}

/// Verifies a password against an Argon2 PHC string.
fn verify_argon2(password: &str, hash: &str) -> Result<bool> {
    let mut password_bytes = password.as_bytes().to_vec();
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Credential(format!("Hash parse error: {}", e)))?;

    let result = match Argon2::default().verify_password(&password_bytes, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Credential(format!("Argon2 verify error: {}", e))),
    };

    password_bytes.zeroize();
    result
}

fn is_phc(stored: &str) -> bool {
    stored.starts_with("$argon2")
}

/// Derives and checks stored credentials according to the configured scheme.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    scheme: PasswordScheme,
}

impl CredentialHasher {
    /// Creates a new `CredentialHasher` that derives new credentials with `scheme`.
    pub fn new(scheme: PasswordScheme) -> Self {
        if scheme == PasswordScheme::Sha256 {
            tracing::warn!(
                "⚠️  Password scheme is unsalted SHA-256; set PASSWORD_SCHEME=argon2id to harden"
            );
        }
        Self { scheme }
    }

    /// The scheme used for newly stored credentials.
    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// Derives the credential to store for `plaintext`.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        match self.scheme {
            PasswordScheme::Sha256 => Ok(derive(plaintext)),
            PasswordScheme::Argon2id => hash_argon2(plaintext),
        }
    }

    /// Confirms `plaintext` against a stored credential of either format.
    pub fn verify(&self, plaintext: &str, stored: &str) -> Result<bool> {
        if is_phc(stored) {
            verify_argon2(plaintext, stored)
        } else {
            Ok(verify_digest(plaintext, stored))
        }
    }

    /// Whether a stored credential should be re-derived with the configured scheme.
    pub fn needs_rehash(&self, stored: &str) -> bool {
        self.scheme == PasswordScheme::Argon2id && !is_phc(stored)
    }
}
