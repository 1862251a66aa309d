use crate::error::AppointmentError;

pub const MAX_COMMENT_LEN: usize = 150;

pub fn validate_rating(rating: i32) -> Result<(), AppointmentError> {
    if !(1..=5).contains(&rating) {
        return Err(AppointmentError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// The comment is optional but capped at 150 characters.
pub fn validate_comment(comment: &str) -> Result<(), AppointmentError> {
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(AppointmentError::Validation(format!(
            "comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(())
}
