use rstest::rstest;
use sqlx::Row;
use uuid::Uuid;

use crate::utils::{prescription_body, spawn_app};

#[tokio::test]
async fn accepting_binds_the_doctor_and_confirms() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;

    let response = app.post_accept(&doctor, appointment_id).await;

    assert_eq!(200, response.status().as_u16());
    let saved = sqlx::query("SELECT status, doctor_id FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch saved appointment.");
    assert_eq!("confirmed", saved.get::<String, _>("status"));
    assert_eq!(Some(doctor.id), saved.get::<Option<Uuid>, _>("doctor_id"));
}

#[tokio::test]
async fn only_the_preferred_doctor_may_accept() {
    let app = spawn_app().await;
    let preferred = app.create_doctor("gregory").await;
    let other = app.create_doctor("james").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(preferred.id)).await;

    assert_eq!(403, app.post_accept(&other, appointment_id).await.status().as_u16());
    assert_eq!(200, app.post_accept(&preferred, appointment_id).await.status().as_u16());
}

#[tokio::test]
async fn a_second_accept_attempt_fails_instead_of_noopping() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;

    assert_eq!(200, app.post_accept(&doctor, appointment_id).await.status().as_u16());
    assert_eq!(409, app.post_accept(&doctor, appointment_id).await.status().as_u16());
}

#[tokio::test]
async fn concurrent_accepts_commit_exactly_once() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;

    let (first, second) = tokio::join!(
        app.post_accept(&doctor, appointment_id),
        app.post_accept(&doctor, appointment_id),
    );

    let mut statuses = [first.status().as_u16(), second.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!([200, 409], statuses);

    let saved = sqlx::query("SELECT status FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch saved appointment.");
    assert_eq!("confirmed", saved.get::<String, _>("status"));
}

#[tokio::test]
async fn status_advances_along_the_legal_chain() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;
    assert_eq!(200, app.post_accept(&doctor, appointment_id).await.status().as_u16());

    assert_eq!(
        200,
        app.post_status(&doctor, appointment_id, "in_progress").await.status().as_u16()
    );
    assert_eq!(
        200,
        app.post_status(&doctor, appointment_id, "completed").await.status().as_u16()
    );
}

#[rstest]
#[case::skipping_a_state("in_progress")]
#[case::moving_backward("confirmed")]
#[tokio::test]
async fn completed_appointments_accept_no_further_transitions(#[case] target: &str) {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.complete_appointment(&patient, &doctor).await;

    let response = app.post_status(&doctor, appointment_id, target).await;
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn a_confirmed_appointment_cannot_skip_to_completed() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;
    assert_eq!(200, app.post_accept(&doctor, appointment_id).await.status().as_u16());

    let response = app.post_status(&doctor, appointment_id, "completed").await;
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn only_the_bound_doctor_may_prescribe_and_only_once() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let other = app.create_doctor("james").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.complete_appointment(&patient, &doctor).await;

    // Unbound doctor is turned away
    assert_eq!(
        403,
        app.post_prescription(&other, appointment_id, &prescription_body())
            .await
            .status()
            .as_u16()
    );

    assert_eq!(
        201,
        app.post_prescription(&doctor, appointment_id, &prescription_body())
            .await
            .status()
            .as_u16()
    );
    assert_eq!(
        409,
        app.post_prescription(&doctor, appointment_id, &prescription_body())
            .await
            .status()
            .as_u16()
    );
}

#[tokio::test]
async fn prescriptions_require_a_completed_appointment() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.book_ok(&patient, Some(doctor.id)).await;
    assert_eq!(200, app.post_accept(&doctor, appointment_id).await.status().as_u16());

    let response = app
        .post_prescription(&doctor, appointment_id, &prescription_body())
        .await;
    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn feedback_is_owner_only_and_only_once() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let other_patient = app.create_patient("ben").await;
    let appointment_id = app.complete_appointment(&patient, &doctor).await;
    let body = serde_json::json!({ "rating": 5, "comment": "excellent care" });

    assert_eq!(
        403,
        app.post_feedback(&other_patient, appointment_id, &body).await.status().as_u16()
    );
    assert_eq!(
        201,
        app.post_feedback(&patient, appointment_id, &body).await.status().as_u16()
    );
    assert_eq!(
        409,
        app.post_feedback(&patient, appointment_id, &body).await.status().as_u16()
    );

    // The bound doctor is copied onto the feedback record
    let saved = sqlx::query("SELECT doctor_id, rating FROM feedback WHERE appointment_id = $1")
        .bind(appointment_id)
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch saved feedback.");
    assert_eq!(doctor.id, saved.get::<Uuid, _>("doctor_id"));
    assert_eq!(5, saved.get::<i32, _>("rating"));
}

#[rstest]
#[case::too_low(0)]
#[case::too_high(6)]
#[tokio::test]
async fn out_of_range_ratings_are_rejected(#[case] rating: i32) {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.complete_appointment(&patient, &doctor).await;

    let response = app
        .post_feedback(
            &patient,
            appointment_id,
            &serde_json::json!({ "rating": rating }),
        )
        .await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn the_detail_view_includes_prescription_and_feedback() {
    let app = spawn_app().await;
    let doctor = app.create_doctor("gregory").await;
    let patient = app.create_patient("ada").await;
    let appointment_id = app.complete_appointment(&patient, &doctor).await;
    app.post_prescription(&doctor, appointment_id, &prescription_body())
        .await;
    app.post_feedback(
        &patient,
        appointment_id,
        &serde_json::json!({ "rating": 4, "comment": "" }),
    )
    .await;

    let response = app.get_detail(&patient, appointment_id).await;
    assert_eq!(200, response.status().as_u16());
    let body: serde_json::Value = response.json().await.expect("Failed to parse response.");
    assert_eq!("completed", body["data"]["appointment"]["status"]);
    assert_eq!("ibuprofen", body["data"]["prescription"]["medicine_names"]);
    assert_eq!(4, body["data"]["feedback"]["rating"]);
}
