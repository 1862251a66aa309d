use actix_web::{web, HttpRequest, HttpResponse};
use anyhow::Context;
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{compute_password_hash, current_user};
use crate::domain::{validate_registration, Role};
use crate::error::AppointmentError;
use crate::models::User;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
    pub role: Role,
    #[serde(default)]
    pub specialization: String,
}

#[tracing::instrument(
    name = "Registering a new user",
    skip(form, pool),
    fields(username = %form.username, role = %form.role)
)]
pub async fn register(
    form: web::Json<RegisterForm>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppointmentError> {
    let RegisterForm {
        username,
        email,
        password,
        role,
        specialization,
    } = form.into_inner();
    validate_registration(&email, role, &specialization)?;

    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn a blocking task")??;

    let user = insert_user(&pool, &username, &email, &password_hash, role, &specialization).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "status": "success",
        "data": user,
    })))
}

#[tracing::instrument(name = "Saving new user in the database", skip(pool, password_hash))]
async fn insert_user(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &Secret<String>,
    role: Role,
    specialization: &str,
) -> Result<User, AppointmentError> {
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, username, email, password_hash, role, specialization)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, username, email, password_hash, role, specialization, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash.expose_secret())
    .bind(role.as_str())
    .bind(specialization)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
            AppointmentError::Validation("this username or email is already registered".into()),
        ),
        Err(e) => {
            tracing::error!("Failed to execute query: {}", e);
            Err(e.into())
        }
    }
}

#[tracing::instrument(
    name = "Logging a user in",
    skip(request, pool),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn login(
    request: HttpRequest,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": {
            "id": user.id,
            "username": user.username,
            "role": user.role,
        },
    })))
}
