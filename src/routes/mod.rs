use actix_web::{web, HttpResponse, Responder};

mod short_link;

use crate::types::{AppState, HealthStatus, ResponsePayload};

// Handler function for the root route "/"
async fn index() -> impl Responder {
    let welcome_message = ResponsePayload {
        status: 200,
        message: String::from("Welcome! POST a URL to /api/links to shorten it."),
    };

    HttpResponse::Ok().json(welcome_message)
}

// Handler function for the health check endpoint
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let uptime = data.start_time.elapsed().as_secs();

    let db_health = match &data.db {
        Some(db) => Some(db.health_check().await),
        None => None,
    };

    let status = HealthStatus {
        status: String::from("OK"),
        version: data.version.clone(),
        storage_backend: data.storage_backend.to_string(),
        db_health,
        uptime_seconds: uptime,
    };

    HttpResponse::Ok().json(status)
}

// Configure all routes function
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
    cfg.route("/health", web::get().to(health_check));
    short_link::configure_api_routes(cfg);
    short_link::configure_redirect_routes(cfg);
}
