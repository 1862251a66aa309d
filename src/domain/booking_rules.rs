use chrono::{NaiveDate, NaiveTime};

use crate::error::AppointmentError;

/// A patient may hold at most this many appointments on a single date.
pub const DAILY_APPOINTMENT_LIMIT: i64 = 2;

pub const MAX_HEALTH_CONCERN_LEN: usize = 200;

pub fn opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time")
}

pub fn closing_time() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("17:00 is a valid time")
}

pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), AppointmentError> {
    if date < today {
        return Err(AppointmentError::PastDate);
    }
    Ok(())
}

/// Both boundaries are bookable: 09:00 and 17:00 pass, 08:59 and 17:01 do not.
pub fn validate_booking_time(time: NaiveTime) -> Result<(), AppointmentError> {
    if time < opening_time() || time > closing_time() {
        return Err(AppointmentError::OutOfHours);
    }
    Ok(())
}

pub fn validate_health_concern(health_concern: &str) -> Result<(), AppointmentError> {
    if health_concern.trim().is_empty() {
        return Err(AppointmentError::Validation(
            "health concern must not be empty".to_string(),
        ));
    }
    if health_concern.chars().count() > MAX_HEALTH_CONCERN_LEN {
        return Err(AppointmentError::Validation(format!(
            "health concern must be at most {} characters",
            MAX_HEALTH_CONCERN_LEN
        )));
    }
    Ok(())
}
