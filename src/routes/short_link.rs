use actix_web::web;

use crate::handlers::{
    create_handler, info_handler, list_handler, redirect_handler, unlock_handler,
    verify_password_handler,
};

// JSON API over the shortening service
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/links")
            .route("", web::post().to(create_handler))
            .route("", web::get().to(list_handler))
            .route("/{id}", web::get().to(info_handler))
            .route("/{id}/verify", web::post().to(verify_password_handler)),
    );
}

// Public short-link routes; registered last so they never shadow other paths
pub fn configure_redirect_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{id}")
            .route(web::get().to(redirect_handler))
            .route(web::post().to(unlock_handler)),
    );
}
