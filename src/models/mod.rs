mod appointment;
mod feedback;
mod prescription;
mod user;

pub use appointment::Appointment;
pub use feedback::Feedback;
pub use prescription::Prescription;
pub use user::User;
