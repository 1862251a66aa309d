use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppointmentError;
use crate::models::User;

/// Accounts only accept addresses on the clinic's own domain.
pub const EMAIL_DOMAIN: &str = "@meditrack.local";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("`{0}` is not a valid role")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Explicit role gate called at the top of every operation, instead of
/// relying on ambient middleware.
pub fn require_role(user: &User, role: Role) -> Result<(), AppointmentError> {
    if user.role == role {
        Ok(())
    } else {
        Err(AppointmentError::Unauthorized)
    }
}

pub fn validate_registration(
    email: &str,
    role: Role,
    specialization: &str,
) -> Result<(), AppointmentError> {
    if !email.ends_with(EMAIL_DOMAIN) {
        return Err(AppointmentError::Validation(format!(
            "email must end with {}",
            EMAIL_DOMAIN
        )));
    }
    if role == Role::Doctor && specialization.trim().is_empty() {
        return Err(AppointmentError::Validation(
            "specialization is required for doctors".to_string(),
        ));
    }
    Ok(())
}
