mod credentials;

pub use credentials::{basic_auth, compute_password_hash, validate_creds, AuthError, Credentials};

use actix_web::HttpRequest;
use sqlx::PgPool;

use crate::error::AppointmentError;
use crate::models::User;

/// Resolves the authenticated user behind a request from its Basic auth
/// credentials. Every protected handler calls this before touching the store.
pub async fn current_user(request: &HttpRequest, pool: &PgPool) -> Result<User, AppointmentError> {
    let credentials =
        basic_auth(request.headers()).map_err(|e| AppointmentError::Auth(e.into()))?;
    tracing::Span::current().record(
        "username",
        tracing::field::display(&credentials.username),
    );

    let user_id = validate_creds(credentials, pool).await.map_err(|e| match e {
        AuthError::InvalidCredentials(_) => AppointmentError::Auth(e.into()),
        AuthError::UnexpectedError(_) => AppointmentError::UnexpectedError(e.into()),
    })?;
    tracing::Span::current().record("user_id", tracing::field::display(&user_id));

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, role, specialization, created_at \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(user)
}
