mod appointments;
mod workflow;
