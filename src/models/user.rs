use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a user account was registered with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A parent managing one or more students.
    #[default]
    Parent,
    /// A teacher running courses.
    Teacher,
}

impl Role {
    /// The lowercase name stored in the database and embedded in tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Parent => "parent",
            Role::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(Role::Parent),
            "teacher" => Ok(Role::Teacher),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Represents a user in the system.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: i64,
    /// The user's email address, used as the login name.
    pub email: String,
    /// The stored credential (legacy SHA-256 hex or an Argon2 PHC string).
    pub password_hash: String,
    /// The user's role.
    pub role: Role,
    /// The user's full name.
    pub full_name: String,
    /// The user's phone number (may be empty).
    pub phone: String,
}

/// The fields needed to insert a new user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub phone: String,
}

/// The public view of a user returned to clients. Never carries the credential.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            full_name: user.full_name.clone(),
        }
    }
}
