use std::sync::Arc;
use std::time::Instant;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{debug, info};

use crate::{
    config::{Config, Environment, ServerConfig, StorageBackend},
    db::Database,
    errors::AppError,
    middleware::RequestTracker,
    repositories::{
        MemoryShortLinkRepository, PostgresShortLinkRepository, ShortLinkRepositoryTrait,
    },
    routes, services,
    types::AppState,
};

// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;

// Setup logging with custom format and configuration
fn setup_logging(config: &Config) -> Result<(), AppError> {
    let log_level = match config.app.environment {
        Environment::Development => config.app.log_level.clone(),
        Environment::Testing => "debug,actix_web=info,sqlx=warn".to_string(),
        Environment::Production => "info,actix_web=warn,sqlx=warn".to_string(),
    };

    let env = Env::default()
        .filter_or("RUST_LOG", log_level)
        .write_style_or("RUST_LOG_STYLE", "always");

    env_logger::try_init_from_env(env)
        .map_err(|e| AppError::Logger(format!("Failed to initialize logger: {}", e)))
}

fn build_cors(server: &ServerConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(3600);

    match server.cors_allowed_origin.as_deref() {
        Some("*") => cors.allow_any_origin(),
        Some(origin) => cors.allowed_origin(origin),
        // Same-origin only
        None => cors,
    }
}

// Production access lines carry the response's X-Request-ID
fn access_log_format(verbose: bool) -> &'static str {
    if verbose {
        "%a \"%r\" %s %b %T"
    } else {
        "%a \"%r\" %s %b %T \"%{Referer}i\" \"%{User-Agent}i\" %{X-Request-ID}o"
    }
}

// Pick the storage port implementation for this run
async fn build_repository(
    config: &Config,
) -> AppResult<(Arc<dyn ShortLinkRepositoryTrait>, Option<Database>)> {
    match config.shortener.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory link storage; links are lost on shutdown");
            Ok((Arc::new(MemoryShortLinkRepository::new()), None))
        }
        StorageBackend::Postgres => {
            let db = Database::connect(&config.db).await?;
            let repository = PostgresShortLinkRepository::new(db.clone());
            Ok((Arc::new(repository), Some(db)))
        }
    }
}

pub async fn server() -> AppResult<()> {
    // Load application configuration
    let config = Config::load()?;

    setup_logging(&config)?;

    // Capture start time for uptime calculation
    let start_time = Instant::now();

    info!("Starting {} v{}", config.app.name, config.app.version);
    info!("Environment: {:?}", config.app.environment);
    info!(
        "Binding to {}:{} with {} workers",
        config.server.host, config.server.port, config.server.workers
    );

    if config.app.environment == Environment::Development {
        debug!("Full configuration: {:?}", config);
    }

    let (repository, db) = build_repository(&config).await?;
    let storage_backend = repository.backend_name();
    info!(
        "Short links served from {} with keys of length {}",
        config.shortener.base_url, config.shortener.key_length
    );

    let service = services::register(repository.clone(), config.shortener.clone());
    let state = web::Data::new(AppState {
        start_time,
        version: config.app.version.clone(),
        storage_backend,
        db,
    });

    let verbose = config.app.environment != Environment::Production;

    let log_format = access_log_format(verbose);

    let server_config = config.server.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(service.clone())
            .wrap(build_cors(&server_config))
            .wrap(RequestTracker::new(verbose))
            // Outermost, so the access log sees the X-Request-ID set by the tracker
            .wrap(Logger::new(log_format))
            .configure(routes::configure_routes)
    })
    .workers(config.server.workers)
    .bind((config.server.host.to_string(), config.server.port))?
    .run()
    .await?;

    info!("Server stopped, releasing storage");
    repository.close().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, HttpResponse};

    fn server_config(origin: Option<&str>) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            workers: 1,
            cors_allowed_origin: origin.map(str::to_string),
        }
    }

    #[::core::prelude::v1::test]
    fn test_production_access_log_reads_response_request_id() {
        assert!(access_log_format(false).contains("%{X-Request-ID}o"));
        assert!(!access_log_format(true).contains("X-Request-ID"));
    }

    #[actix_web::test]
    async fn test_middleware_wrapped_after_tracker_sees_request_id() {
        use actix_web::dev::Service;
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(None::<String>));
        let observed = seen.clone();

        // Same order as the server: tracker first, access logging outside it
        let app = test::init_service(
            App::new()
                .wrap(RequestTracker::new(false))
                .wrap_fn(move |req, srv| {
                    let observed = observed.clone();
                    let fut = srv.call(req);
                    async move {
                        let res = fut.await?;
                        *observed.lock().unwrap() = res
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        Ok(res)
                    }
                })
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("x-request-id", "abc-123"))
            .to_request();
        test::call_service(&app, req).await;

        assert_eq!(seen.lock().unwrap().as_deref(), Some("abc-123"));
    }

    #[actix_web::test]
    async fn test_cors_allows_configured_origin() {
        let app = test::init_service(
            App::new()
                .wrap(build_cors(&server_config(Some("https://app.example"))))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((header::ORIGIN, "https://app.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
    }
}
