use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::domain::Role;

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub specialization: String,
    pub created_at: DateTime<Utc>,
}

impl<'c> FromRow<'c, PgRow> for User {
    fn from_row(row: &'c PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: role.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "role".into(),
                source: Box::new(e),
            })?,
            specialization: row.try_get("specialization")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
