use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Local, NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::current_user;
use crate::domain::{
    require_role, validate_booking_date, validate_booking_time, validate_comment,
    validate_health_concern, validate_rating, AppointmentStatus, Role, DAILY_APPOINTMENT_LIMIT,
};
use crate::error::AppointmentError;
use crate::models::{Appointment, Feedback, Prescription, User};

#[derive(Debug, Deserialize)]
pub struct BookingForm {
    pub preferred_doctor_id: Option<Uuid>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub health_concern: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize)]
pub struct PrescriptionForm {
    pub medicine_names: String,
    pub dosage_instructions: String,
    pub frequency: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

#[tracing::instrument(
    name = "Booking a new appointment",
    skip(form, pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn book_appointment(
    form: web::Json<BookingForm>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Patient)?;
    let form = form.into_inner();

    validate_booking_date(form.appointment_date, Local::now().date_naive())?;
    validate_booking_time(form.appointment_time)?;
    validate_health_concern(&form.health_concern)?;
    if let Some(doctor_id) = form.preferred_doctor_id {
        ensure_doctor_exists(&pool, doctor_id).await?;
    }

    let appointment = book(&pool, &user, &form).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "status": "success",
        "data": appointment,
    })))
}

async fn ensure_doctor_exists(pool: &PgPool, doctor_id: Uuid) -> Result<(), AppointmentError> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(doctor_id)
        .fetch_optional(pool)
        .await?;
    match role.as_deref() {
        Some("doctor") => Ok(()),
        _ => Err(AppointmentError::Validation(
            "preferred doctor does not exist".into(),
        )),
    }
}

/// The daily-limit check and the insert share one transaction. There is no
/// doctor time-slot exclusivity: overlapping preferred-doctor requests are
/// allowed and resolved later by the acceptance race.
#[tracing::instrument(name = "Saving new appointment details in the database", skip(pool, patient))]
pub async fn book(
    pool: &PgPool,
    patient: &User,
    form: &BookingForm,
) -> Result<Appointment, AppointmentError> {
    let mut tx = pool.begin().await?;
    let same_day: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments WHERE patient_id = $1 AND appointment_date = $2",
    )
    .bind(patient.id)
    .bind(form.appointment_date)
    .fetch_one(&mut *tx)
    .await?;
    if same_day >= DAILY_APPOINTMENT_LIMIT {
        return Err(AppointmentError::DailyLimitExceeded);
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments
            (id, patient_id, preferred_doctor_id, appointment_date, appointment_time, health_concern)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(patient.id)
    .bind(form.preferred_doctor_id)
    .bind(form.appointment_date)
    .bind(form.appointment_time)
    .bind(&form.health_concern)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(appointment)
}

#[tracing::instrument(
    name = "Patient views their appointments",
    skip(pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn get_patient_appointments(
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Patient)?;
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE patient_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(list_response(appointments))
}

/// The acceptance queue: every pending appointment, visible to any doctor.
#[tracing::instrument(
    name = "Doctor views the pending queue",
    skip(pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn get_pending_appointments(
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Doctor)?;
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE status = 'pending' ORDER BY created_at DESC",
    )
    .fetch_all(pool.get_ref())
    .await?;
    Ok(list_response(appointments))
}

#[tracing::instrument(
    name = "Doctor views their appointments",
    skip(pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn get_doctor_appointments(
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Doctor)?;
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE doctor_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.id)
    .fetch_all(pool.get_ref())
    .await?;
    Ok(list_response(appointments))
}

#[tracing::instrument(
    name = "Doctor accepts a pending appointment",
    skip(pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn accept_appointment(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Doctor)?;
    let appointment = accept(&pool, path.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": appointment,
    })))
}

/// Binds the accepting doctor and confirms the appointment in a single
/// transaction. Doctors racing for the same pending appointment serialize on
/// the row lock; the loser re-reads a non-pending status and gets
/// `InvalidState`. A second accept of an already confirmed appointment errors
/// the same way rather than no-opping.
pub async fn accept(
    pool: &PgPool,
    appointment_id: Uuid,
    doctor: &User,
) -> Result<Appointment, AppointmentError> {
    let mut tx = pool.begin().await?;
    let appointment = lock_appointment(&mut tx, appointment_id).await?;
    if appointment.status != AppointmentStatus::Pending {
        return Err(AppointmentError::InvalidState);
    }
    if !appointment.may_accept(doctor) {
        return Err(AppointmentError::Unauthorized);
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointments SET status = $2, doctor_id = $3, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(appointment_id)
    .bind(AppointmentStatus::Confirmed.as_str())
    .bind(doctor.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(appointment)
}

#[tracing::instrument(
    name = "Doctor updates the appointment status",
    skip(form, pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn update_appointment_status(
    path: web::Path<Uuid>,
    form: web::Json<StatusForm>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Doctor)?;
    let appointment = transition(&pool, path.into_inner(), form.into_inner().status, &user).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": appointment,
    })))
}

/// Advances the status along the legal transition table. Only the bound
/// doctor may do this; nothing but status and updated_at changes.
pub async fn transition(
    pool: &PgPool,
    appointment_id: Uuid,
    new_status: AppointmentStatus,
    doctor: &User,
) -> Result<Appointment, AppointmentError> {
    let mut tx = pool.begin().await?;
    let appointment = lock_appointment(&mut tx, appointment_id).await?;
    if !appointment.is_bound_to(doctor) {
        return Err(AppointmentError::Unauthorized);
    }
    if !appointment.status.can_transition_to(new_status) {
        return Err(AppointmentError::InvalidTransition {
            from: appointment.status,
            to: new_status,
        });
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        "UPDATE appointments SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(appointment_id)
    .bind(new_status.as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(appointment)
}

#[tracing::instrument(
    name = "Doctor adds a prescription",
    skip(form, pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn add_prescription(
    path: web::Path<Uuid>,
    form: web::Json<PrescriptionForm>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Doctor)?;
    let form = form.into_inner();
    for (field, value) in [
        ("medicine_names", &form.medicine_names),
        ("dosage_instructions", &form.dosage_instructions),
        ("frequency", &form.frequency),
    ] {
        if value.trim().is_empty() {
            return Err(AppointmentError::Validation(format!(
                "{} must not be empty",
                field
            )));
        }
    }
    let prescription = attach_prescription(&pool, path.into_inner(), &user, &form).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "status": "success",
        "data": prescription,
    })))
}

/// Exactly one prescription per appointment, only once the appointment is
/// completed, only by the bound doctor. The unique constraint on
/// appointment_id backs the only-once rule.
pub async fn attach_prescription(
    pool: &PgPool,
    appointment_id: Uuid,
    doctor: &User,
    form: &PrescriptionForm,
) -> Result<Prescription, AppointmentError> {
    let mut tx = pool.begin().await?;
    let appointment = lock_appointment(&mut tx, appointment_id).await?;
    if !appointment.is_bound_to(doctor) {
        return Err(AppointmentError::Unauthorized);
    }
    if appointment.status != AppointmentStatus::Completed {
        return Err(AppointmentError::InvalidState);
    }

    let result = sqlx::query_as::<_, Prescription>(
        r#"
        INSERT INTO prescriptions (id, appointment_id, medicine_names, dosage_instructions, frequency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(appointment_id)
    .bind(&form.medicine_names)
    .bind(&form.dosage_instructions)
    .bind(&form.frequency)
    .fetch_one(&mut *tx)
    .await;
    let prescription = match result {
        Ok(prescription) => prescription,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppointmentError::AlreadyExists("a prescription"))
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;
    Ok(prescription)
}

#[tracing::instrument(
    name = "Patient submits feedback",
    skip(form, pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn submit_feedback(
    path: web::Path<Uuid>,
    form: web::Json<FeedbackForm>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    require_role(&user, Role::Patient)?;
    let form = form.into_inner();
    validate_rating(form.rating)?;
    validate_comment(&form.comment)?;
    let feedback = attach_feedback(&pool, path.into_inner(), &user, &form).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "status": "success",
        "data": feedback,
    })))
}

/// Exactly one feedback per appointment, only once completed, only by the
/// owning patient. The bound doctor is copied onto the feedback record.
pub async fn attach_feedback(
    pool: &PgPool,
    appointment_id: Uuid,
    patient: &User,
    form: &FeedbackForm,
) -> Result<Feedback, AppointmentError> {
    let mut tx = pool.begin().await?;
    let appointment = lock_appointment(&mut tx, appointment_id).await?;
    if !appointment.is_owned_by(patient) {
        return Err(AppointmentError::Unauthorized);
    }
    if appointment.status != AppointmentStatus::Completed {
        return Err(AppointmentError::InvalidState);
    }
    let doctor_id = appointment.doctor_id.ok_or_else(|| {
        AppointmentError::UnexpectedError(anyhow::anyhow!(
            "completed appointment {} has no bound doctor",
            appointment.id
        ))
    })?;

    let result = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (id, appointment_id, patient_id, doctor_id, rating, comment)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(appointment_id)
    .bind(patient.id)
    .bind(doctor_id)
    .bind(form.rating)
    .bind(&form.comment)
    .fetch_one(&mut *tx)
    .await;
    let feedback = match result {
        Ok(feedback) => feedback,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppointmentError::AlreadyExists("feedback"))
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await?;
    Ok(feedback)
}

#[tracing::instrument(
    name = "Viewing appointment details",
    skip(pool, request),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
pub async fn appointment_detail(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    request: HttpRequest,
) -> Result<HttpResponse, AppointmentError> {
    let user = current_user(&request, &pool).await?;
    let appointment_id = path.into_inner();
    let appointment =
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or(AppointmentError::NotFound)?;
    // Existence is hidden from unrelated users, never surfaced as Forbidden
    if !appointment.is_visible_to(&user) {
        return Err(AppointmentError::NotFound);
    }

    let prescription = sqlx::query_as::<_, Prescription>(
        "SELECT * FROM prescriptions WHERE appointment_id = $1",
    )
    .bind(appointment_id)
    .fetch_optional(pool.get_ref())
    .await?;
    let feedback =
        sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE appointment_id = $1")
            .bind(appointment_id)
            .fetch_optional(pool.get_ref())
            .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "data": {
            "appointment": appointment,
            "prescription": prescription,
            "feedback": feedback,
        },
    })))
}

async fn lock_appointment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    appointment_id: Uuid,
) -> Result<Appointment, AppointmentError> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
        .bind(appointment_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppointmentError::NotFound)
}

fn list_response(appointments: Vec<Appointment>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "success",
        "length": appointments.len(),
        "data": appointments,
    }))
}
