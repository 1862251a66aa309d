use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Clone, FromRow)]
pub struct Prescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub medicine_names: String,
    pub dosage_instructions: String,
    pub frequency: String,
    pub created_at: DateTime<Utc>,
}
