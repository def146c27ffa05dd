use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use storefront_api::application::auth_service::{AuthService, ResetMailSettings};
use storefront_api::application::store_service::StoreService;
use storefront_api::data::cart_repository::InMemoryCartRepository;
use storefront_api::data::item_repository::InMemoryItemRepository;
use storefront_api::data::user_repository::InMemoryUserRepository;
use storefront_api::infrastructure::config::AppConfig;
use storefront_api::infrastructure::logging::init_logging;
use storefront_api::infrastructure::mailer::LogMailer;
use storefront_api::infrastructure::security::SessionIssuer;
use storefront_api::presentation::handlers::AppState;
use storefront_api::presentation::middleware::{
    RequestIdMiddleware, SessionMiddleware, TimingMiddleware,
};
use storefront_api::presentation::routes::{ROUTES, configure};
use tracing::{error, info};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    info!("Logging initialized");

    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Refusing to start");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let sessions = SessionIssuer::new(config.app_secret.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let auth_service = AuthService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(LogMailer::new()),
        sessions.clone(),
        ResetMailSettings {
            frontend_url: config.frontend_url.clone(),
            mail_from: config.mail_from.clone(),
        },
    );
    let store_service = StoreService::new(
        Arc::new(InMemoryItemRepository::new()),
        Arc::new(InMemoryCartRepository::new()),
    );

    let state = web::Data::new(AppState {
        auth_service: Arc::new(auth_service),
        store_service,
    });
    info!("Application state initialized");

    let frontend_url = config.frontend_url.clone();
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware::new(sessions.clone()))
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .configure(configure)
    });

    let server = server.bind(config.bind_addr.as_str())?;
    info!(
        address = %config.bind_addr,
        frontend = %config.frontend_url,
        routes = %ROUTES,
        "Starting HTTP server"
    );
    server.run().await
}
