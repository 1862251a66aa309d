mod accounts;
mod appointments;
mod health_check;

pub use accounts::{login, register};
pub use appointments::{
    accept_appointment, add_prescription, appointment_detail, book_appointment,
    get_doctor_appointments, get_patient_appointments, get_pending_appointments, submit_feedback,
    update_appointment_status,
};
pub use health_check::health_check;
