mod appointment_status;
mod booking_rules;
mod feedback_rules;
mod user_role;

pub use appointment_status::{AppointmentStatus, ParseStatusError};
pub use booking_rules::{
    closing_time, opening_time, validate_booking_date, validate_booking_time,
    validate_health_concern, DAILY_APPOINTMENT_LIMIT, MAX_HEALTH_CONCERN_LEN,
};
pub use feedback_rules::{validate_comment, validate_rating, MAX_COMMENT_LEN};
pub use user_role::{require_role, validate_registration, ParseRoleError, Role, EMAIL_DOMAIN};
