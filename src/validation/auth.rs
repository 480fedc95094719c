use garde::Validate;

use crate::error::{AppError, Result};
use crate::models::user::Role;

/// Registration input after the required-field check.
#[derive(Debug, Validate)]
pub struct Registration {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
    #[garde(length(min = 1))]
    pub full_name: String,
    #[garde(skip)]
    pub phone: String,
    #[garde(skip)]
    pub role: Role,
}

/// Returns the value if it is present and not blank.
pub fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses the requested role, defaulting to `parent` when absent.
pub fn parse_role(role: Option<&str>) -> Result<Role> {
    match present(role) {
        None => Ok(Role::default()),
        Some(r) => r
            .parse()
            .map_err(|_| AppError::Validation("Invalid role".to_string())),
    }
}

/// Validates registration input.
///
/// # Arguments
///
/// * `registration` - The registration to validate.
///
/// # Returns
///
/// A `Result<()>` indicating whether the registration is valid.
pub fn validate_registration(registration: &Registration) -> Result<()> {
    registration
        .validate()
        .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))
}
