use serde::{Deserialize, Serialize};

use crate::models::user::Role;

/// The JOSE header carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// The identity claims embedded in a token payload.
///
/// Field order matches the wire payload: `user_id`, `email`, `role`, `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The subject's numeric user id.
    pub user_id: i64,
    /// The subject's email address.
    pub email: String,
    /// The subject's role.
    pub role: Role,
    /// Expiry as a Unix timestamp in seconds. Absent means `0`, which is always expired.
    #[serde(default)]
    pub exp: i64,
}
