use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::AppointmentStatus;
use crate::utils::error_chain_fmt;

/// Failure modes of the appointment workflow. All of these are recoverable
/// at the request boundary and surface as user-visible messages.
#[derive(thiserror::Error)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),
    #[error("appointment date cannot be in the past")]
    PastDate,
    #[error("appointment time must be between 9:00 AM and 5:00 PM")]
    OutOfHours,
    #[error("you cannot book more than 2 appointments on the same day")]
    DailyLimitExceeded,
    #[error("cannot move appointment from `{from}` to `{to}`")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("appointment is not in the required state")]
    InvalidState,
    #[error("you are not authorized to perform this action")]
    Unauthorized,
    #[error("{0} already exists for this appointment")]
    AlreadyExists(&'static str),
    #[error("appointment not found")]
    NotFound,
    #[error("authentication failed")]
    Auth(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for AppointmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<sqlx::Error> for AppointmentError {
    fn from(e: sqlx::Error) -> Self {
        Self::UnexpectedError(anyhow::Error::from(e).context("Failed to execute query"))
    }
}

impl ResponseError for AppointmentError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::PastDate | Self::OutOfHours => StatusCode::BAD_REQUEST,
            Self::DailyLimitExceeded
            | Self::InvalidTransition { .. }
            | Self::InvalidState
            | Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Auth(_) => {
                let mut response = HttpResponse::new(StatusCode::UNAUTHORIZED);
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(r#"Basic realm="Restricted""#),
                );
                response
            }
            Self::UnexpectedError(_) => HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR),
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "status": "error",
                "message": self.to_string(),
            })),
        }
    }
}
