pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod utils;
