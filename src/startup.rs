use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::routes::{
    accept_appointment, add_prescription, appointment_detail, book_appointment,
    get_doctor_appointments, get_patient_appointments, get_pending_appointments, health_check,
    login, register, submit_feedback, update_appointment_status,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let connection = get_connection_pool(&config.database);
        let port = listener.local_addr()?.port();
        let server = run(listener, connection)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

pub fn run(listener: TcpListener, db_pool: PgPool) -> Result<Server, anyhow::Error> {
    let connection: web::Data<PgPool> = web::Data::new(db_pool);
    let server: Server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .service(
                web::scope("/accounts").route("/register", web::post().to(register)),
            )
            .service(
                web::scope("/patients")
                    .route("/appointments", web::post().to(book_appointment))
                    .route("/appointments", web::get().to(get_patient_appointments))
                    .route(
                        "/appointments/{id}/feedback",
                        web::post().to(submit_feedback),
                    ),
            )
            .service(
                web::scope("/doctors")
                    .route("/appointments", web::get().to(get_pending_appointments))
                    .route("/appointments/mine", web::get().to(get_doctor_appointments))
                    .route(
                        "/appointments/{id}/accept",
                        web::post().to(accept_appointment),
                    )
                    .route(
                        "/appointments/{id}/status",
                        web::post().to(update_appointment_status),
                    )
                    .route(
                        "/appointments/{id}/prescription",
                        web::post().to(add_prescription),
                    ),
            )
            .route("/appointments/{id}", web::get().to(appointment_detail))
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::post().to(login))
            .app_data(connection.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
