use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::domain::AppointmentStatus;
use crate::models::User;

#[derive(Debug, Serialize, Clone)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Doctor bound on acceptance; unset while the appointment is pending.
    pub doctor_id: Option<Uuid>,
    /// Doctor the patient asked for at booking time, not yet confirmed.
    pub preferred_doctor_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub health_concern: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Only the patient, the bound doctor, or the preferred doctor may see
    /// this appointment; everyone else gets a NotFound.
    pub fn is_visible_to(&self, user: &User) -> bool {
        self.patient_id == user.id
            || self.doctor_id == Some(user.id)
            || self.preferred_doctor_id == Some(user.id)
    }

    pub fn is_bound_to(&self, user: &User) -> bool {
        self.doctor_id == Some(user.id)
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.patient_id == user.id
    }

    pub fn may_accept(&self, user: &User) -> bool {
        self.doctor_id == Some(user.id) || self.preferred_doctor_id == Some(user.id)
    }
}

impl<'c> FromRow<'c, PgRow> for Appointment {
    fn from_row(row: &'c PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Appointment {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            doctor_id: row.try_get("doctor_id")?,
            preferred_doctor_id: row.try_get("preferred_doctor_id")?,
            appointment_date: row.try_get("appointment_date")?,
            appointment_time: row.try_get("appointment_time")?,
            health_concern: row.try_get("health_concern")?,
            status: status.parse().map_err(|e| sqlx::Error::ColumnDecode {
                index: "status".into(),
                source: Box::new(e),
            })?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
