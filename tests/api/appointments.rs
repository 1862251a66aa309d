use chrono::Duration;
use rstest::rstest;
use sqlx::Row;
use uuid::Uuid;

use crate::utils::{booking_body, spawn_app, tomorrow};

#[tokio::test]
async fn booking_an_appointment_creates_it_pending_and_unbound() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;

    let response = app
        .post_booking(&patient, &booking_body(Some(doctor.id), tomorrow(), "10:00:00"))
        .await;

    assert_eq!(201, response.status().as_u16());
    let saved = sqlx::query("SELECT status, doctor_id, preferred_doctor_id FROM appointments")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch saved appointment.");
    assert_eq!("pending", saved.get::<String, _>("status"));
    assert_eq!(None, saved.get::<Option<Uuid>, _>("doctor_id"));
    assert_eq!(
        Some(doctor.id),
        saved.get::<Option<Uuid>, _>("preferred_doctor_id")
    );
}

#[rstest]
#[case::at_opening("09:00:00", 201)]
#[case::at_closing("17:00:00", 201)]
#[case::before_opening("08:59:00", 400)]
#[case::after_closing("17:01:00", 400)]
#[tokio::test]
async fn clinic_hours_are_enforced_inclusively(#[case] time: &str, #[case] expected: u16) {
    let app = spawn_app().await;
    let patient = app.create_patient("ada").await;

    let response = app
        .post_booking(&patient, &booking_body(None, tomorrow(), time))
        .await;

    assert_eq!(expected, response.status().as_u16());
}

#[tokio::test]
async fn booking_in_the_past_is_rejected() {
    let app = spawn_app().await;
    let patient = app.create_patient("ada").await;

    let yesterday = tomorrow() - Duration::days(2);
    let response = app
        .post_booking(&patient, &booking_body(None, yesterday, "10:00:00"))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn a_third_booking_on_the_same_date_is_refused() {
    let app = spawn_app().await;
    let patient = app.create_patient("ada").await;

    for _ in 0..2 {
        let response = app
            .post_booking(&patient, &booking_body(None, tomorrow(), "10:00:00"))
            .await;
        assert_eq!(201, response.status().as_u16());
    }

    let third = app
        .post_booking(&patient, &booking_body(None, tomorrow(), "11:00:00"))
        .await;
    assert_eq!(409, third.status().as_u16());

    // The day after is unaffected
    let next_day = app
        .post_booking(
            &patient,
            &booking_body(None, tomorrow() + Duration::days(1), "10:00:00"),
        )
        .await;
    assert_eq!(201, next_day.status().as_u16());
}

#[tokio::test]
async fn requests_missing_authorization_are_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(format!("{}/patients/appointments", app.address))
        .json(&booking_body(None, tomorrow(), "10:00:00"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        r#"Basic realm="Restricted""#,
        response.headers()["WWW-Authenticate"]
    );
}

#[tokio::test]
async fn doctors_cannot_book_appointments() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;

    let response = app
        .post_booking(&doctor, &booking_body(None, tomorrow(), "10:00:00"))
        .await;

    assert_eq!(403, response.status().as_u16());
}

#[tokio::test]
async fn patients_only_see_their_own_appointments() {
    let app = spawn_app().await;
    let ada = app.create_patient("ada").await;
    let ben = app.create_patient("ben").await;
    app.book_ok(&ada, None).await;

    let response = app.get_patient_appointments(&ben).await;
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(0, body["length"]);

    let response = app.get_patient_appointments(&ada).await;
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(1, body["length"]);
}

#[tokio::test]
async fn the_pending_queue_only_lists_unaccepted_appointments() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let accepted = app.book_ok(&patient, Some(doctor.id)).await;
    let waiting = app.book_ok(&patient, Some(doctor.id)).await;
    assert_eq!(200, app.post_accept(&doctor, accepted).await.status().as_u16());

    let response = app.get_pending_appointments(&doctor).await;
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(1, body["length"]);
    assert_eq!(waiting.to_string(), body["data"][0]["id"]);

    // The accepted one moved to the doctor's own listing
    let response = app.get_doctor_appointments(&doctor).await;
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(1, body["length"]);
    assert_eq!(accepted.to_string(), body["data"][0]["id"]);
}

#[tokio::test]
async fn unrelated_users_get_404_on_the_detail_page() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let stranger = app.create_patient("ben").await;
    let other_doctor = app.create_doctor("james").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;

    // Existence is hidden, not merely forbidden
    assert_eq!(404, app.get_detail(&stranger, appointment_id).await.status().as_u16());
    assert_eq!(
        404,
        app.get_detail(&other_doctor, appointment_id).await.status().as_u16()
    );

    assert_eq!(200, app.get_detail(&patient, appointment_id).await.status().as_u16());
    assert_eq!(200, app.get_detail(&doctor, appointment_id).await.status().as_u16());
}
