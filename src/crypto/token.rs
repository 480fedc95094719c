//! Compact HS256 bearer tokens.
//!
//! A token is `base64url(header).base64url(payload).base64url(hmac)` with the
//! padding stripped from every segment, so any standard JWT verifier holding the
//! same secret can check it. Nothing is stored server-side: validity is computed
//! from the token itself plus the signing secret.

use std::fmt;
use std::sync::Arc;

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::models::claims::{Claims, TokenHeader};
use crate::models::user::Role;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in days.
pub const DEFAULT_TTL_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// URL-safe alphabet, no padding on encode, padding optional on decode.
const B64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a token was rejected.
///
/// Only used for diagnostics. Callers of [`TokenService::verify`] see a single
/// opaque `None` regardless of the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("expected 3 segments, found {0}")]
    Malformed(usize),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("payload decode failed: {0}")]
    Decode(String),

    #[error("token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("invalid signing key")]
    Key,
}

/// Issues and verifies signed bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    secret: Arc<Zeroizing<Vec<u8>>>,
    ttl_seconds: i64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[redacted]")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenService {
    /// Creates a `TokenService` signing with `secret`.
    ///
    /// An empty secret is accepted; startup code is responsible for warning about it.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(Zeroizing::new(secret.into())),
            ttl_seconds: DEFAULT_TTL_DAYS * SECONDS_PER_DAY,
        }
    }

    /// Overrides the token lifetime. Out-of-range values saturate.
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_seconds = days.saturating_mul(SECONDS_PER_DAY);
        self
    }

    /// The lifetime applied to newly issued tokens, in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issues a token for the given identity, expiring `ttl` from now.
    pub fn issue(&self, user_id: i64, email: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, email, role, chrono::Utc::now().timestamp())
    }

    /// Issues a token as if the current time were `now` (Unix seconds).
    pub fn issue_at(
        &self,
        user_id: i64,
        email: &str,
        role: Role,
        now: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            email: email.to_string(),
            role,
            exp: now.saturating_add(self.ttl_seconds),
        };
        self.sign(&claims)
    }

    /// Signs an arbitrary claim set. The `exp` claim is taken as given.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = sonic_rs::to_string(&TokenHeader::default())
            .map_err(|e| TokenError::Encode(e.to_string()))?;
        let payload =
            sonic_rs::to_string(claims).map_err(|e| TokenError::Encode(e.to_string()))?;

        let header_b64 = B64URL.encode(header.as_bytes());
        let payload_b64 = B64URL.encode(payload.as_bytes());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = self.signature(signing_input.as_bytes())?;

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verifies a token and returns its claims, or `None` if it is invalid for any reason.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match self.verify_detailed(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::debug!("Token rejected: {}", e);
                None
            }
        }
    }

    /// Verifies a token against the current time, reporting why it failed.
    pub fn verify_detailed(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verifies a token as if the current time were `now` (Unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_provided] = parts[..] else {
            return Err(TokenError::Malformed(parts.len()));
        };

        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature_expected = self.signature(signing_input.as_bytes())?;

        if !bool::from(
            signature_provided
                .as_bytes()
                .ct_eq(signature_expected.as_bytes()),
        ) {
            return Err(TokenError::SignatureMismatch);
        }

        let payload_raw = B64URL
            .decode(payload_b64.as_bytes())
            .map_err(|e| TokenError::Decode(e.to_string()))?;
        let claims: Claims =
            sonic_rs::from_slice(&payload_raw).map_err(|e| TokenError::Decode(e.to_string()))?;

        if claims.exp < now {
            return Err(TokenError::Expired {
                exp: claims.exp,
                now,
            });
        }

        Ok(claims)
    }

    fn signature(&self, signing_input: &[u8]) -> Result<String, TokenError> {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_slice()).map_err(|_| TokenError::Key)?;
        mac.update(signing_input);
        Ok(B64URL.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn service() -> TokenService {
        TokenService::new("test-secret-that-is-long-enough-for-hmac")
    }

    fn replace_char(segment: &str, index: usize) -> String {
        segment
            .char_indices()
            .map(|(i, c)| {
                if i == index {
                    if c == 'A' { 'B' } else { 'A' }
                } else {
                    c
                }
            })
            .collect()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let tokens = service();
        let token = tokens.issue(42, "a@b.com", Role::Teacher).unwrap();

        let claims = tokens.verify(&token).expect("freshly issued token must verify");
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, Role::Teacher);

        let expected_exp = chrono::Utc::now().timestamp() + 604_800;
        assert!((claims.exp - expected_exp).abs() <= 1);
    }

    #[test]
    fn test_wire_format() {
        let token = service().issue_at(42, "a@b.com", Role::Teacher, NOW).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| !p.contains('=')));

        let header = B64URL.decode(parts[0]).unwrap();
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);

        let payload = B64URL.decode(parts[1]).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            format!(
                r#"{{"user_id":42,"email":"a@b.com","role":"teacher","exp":{}}}"#,
                NOW + 604_800
            )
        );
    }

    #[test]
    fn test_known_signature_vector() {
        // Standard HS256 reference token with secret "your-256-bit-secret".
        let header_b64 = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let payload_b64 = "eyJzdWIiOiIxMjM0NTY3ODkwIiwibmFtZSI6IkpvaG4gRG9lIiwiaWF0IjoxNTE2MjM5MDIyfQ";
        let tokens = TokenService::new("your-256-bit-secret");
        let signature = tokens
            .signature(format!("{header_b64}.{payload_b64}").as_bytes())
            .unwrap();
        assert_eq!(signature, "SflKxwRJSMeKKF2QT4fwpMeJf36POk6yJV_adQssw5c");
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let tokens = service();
        let token = tokens.issue_at(7, "p@school.org", Role::Parent, NOW).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        for index in 0..parts[1].len() {
            let tampered = format!("{}.{}.{}", parts[0], replace_char(parts[1], index), parts[2]);
            assert_eq!(
                tokens.verify_at(&tampered, NOW),
                Err(TokenError::SignatureMismatch),
                "payload tampered at {index} must be rejected"
            );
        }
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let tokens = service();
        let token = tokens.issue_at(7, "p@school.org", Role::Parent, NOW).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        for index in 0..parts[2].len() {
            let tampered = format!("{}.{}.{}", parts[0], parts[1], replace_char(parts[2], index));
            assert!(tokens.verify_at(&tampered, NOW).is_err());
        }
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service();
        let claims = Claims {
            user_id: 1,
            email: "old@school.org".to_string(),
            role: Role::Parent,
            exp: NOW - 300,
        };
        let token = tokens.sign(&claims).unwrap();

        assert_eq!(
            tokens.verify_at(&token, NOW),
            Err(TokenError::Expired {
                exp: NOW - 300,
                now: NOW
            })
        );
        assert!(tokens.verify(&token).is_none());
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let tokens = service();
        let claims = Claims {
            user_id: 1,
            email: "edge@school.org".to_string(),
            role: Role::Parent,
            exp: NOW,
        };
        let token = tokens.sign(&claims).unwrap();
        assert!(tokens.verify_at(&token, NOW).is_ok());
        assert!(tokens.verify_at(&token, NOW + 1).is_err());
    }

    #[test]
    fn test_missing_exp_defaults_to_expired() {
        let tokens = service();
        let header_b64 = B64URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload_b64 = B64URL.encode(br#"{"user_id":1,"email":"x@y.z","role":"parent"}"#);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let token = format!(
            "{signing_input}.{}",
            tokens.signature(signing_input.as_bytes()).unwrap()
        );

        assert_eq!(
            tokens.verify_at(&token, NOW),
            Err(TokenError::Expired { exp: 0, now: NOW })
        );
    }

    #[test]
    fn test_wrong_segment_count_is_rejected() {
        let tokens = service();
        assert_eq!(tokens.verify_at("", NOW), Err(TokenError::Malformed(1)));
        assert_eq!(tokens.verify_at("a.b", NOW), Err(TokenError::Malformed(2)));
        assert_eq!(tokens.verify_at("a.b.c.d", NOW), Err(TokenError::Malformed(4)));
        assert!(tokens.verify("not.a.token").is_none());
    }

    #[test]
    fn test_signed_garbage_payload_is_decode_error() {
        let tokens = service();
        let header_b64 = B64URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload_b64 = B64URL.encode(b"not json");
        let signing_input = format!("{header_b64}.{payload_b64}");
        let token = format!(
            "{signing_input}.{}",
            tokens.signature(signing_input.as_bytes()).unwrap()
        );

        assert!(matches!(
            tokens.verify_at(&token, NOW),
            Err(TokenError::Decode(_))
        ));
    }

    #[test]
    fn test_different_secret_is_rejected() {
        let token = TokenService::new("secret-alpha")
            .issue(1, "a@b.com", Role::Parent)
            .unwrap();
        assert!(TokenService::new("secret-bravo").verify(&token).is_none());
    }

    #[test]
    fn test_empty_secret_still_signs() {
        let tokens = TokenService::new("");
        let token = tokens.issue(3, "e@x.com", Role::Parent).unwrap();
        assert!(tokens.verify(&token).is_some());
        assert!(service().verify(&token).is_none());
    }

    #[test]
    fn test_custom_ttl() {
        let tokens = service().with_ttl_days(1);
        let token = tokens.issue_at(1, "a@b.com", Role::Parent, NOW).unwrap();
        let claims = tokens.verify_at(&token, NOW).unwrap();
        assert_eq!(claims.exp, NOW + 86_400);
        assert!(tokens.verify_at(&token, NOW + 86_401).is_err());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let tokens = service().with_ttl_days(200_000_000_000_000);
        assert_eq!(tokens.ttl_seconds(), i64::MAX);

        let token = tokens.issue_at(1, "a@b.com", Role::Parent, NOW).unwrap();
        let claims = tokens.verify_at(&token, NOW).unwrap();
        assert_eq!(claims.exp, i64::MAX);
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let tokens = service();
        let header_b64 = B64URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload_b64 = base64::engine::general_purpose::URL_SAFE
            .encode(br#"{"user_id":1,"email":"a@b.c","role":"parent","exp":9999999999}"#);
        assert!(payload_b64.ends_with('='));

        let signing_input = format!("{header_b64}.{payload_b64}");
        let token = format!(
            "{signing_input}.{}",
            tokens.signature(signing_input.as_bytes()).unwrap()
        );

        let claims = tokens.verify_at(&token, NOW).unwrap();
        assert_eq!(
            claims,
            Claims {
                user_id: 1,
                email: "a@b.c".to_string(),
                role: Role::Parent,
                exp: 9_999_999_999,
            }
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains("test-secret"));
    }
}
