use crate::application::auth_service::AuthService;
use crate::application::store_service::StoreService;
use crate::data::cart_repository::InMemoryCartRepository;
use crate::data::item_repository::InMemoryItemRepository;
use crate::data::user_repository::InMemoryUserRepository;
use crate::domain::cart::AddToCart;
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::item::{CreateItem, ItemsWindow, UpdateItem};
use crate::domain::session::{CookieDirective, CookieJar};
use crate::infrastructure::mailer::LogMailer;
use crate::presentation::middleware::SessionUserId;
use actix_web::cookie::{Cookie, time::Duration as CookieDuration};
use actix_web::{FromRequest, HttpMessage, HttpResponse, HttpResponseBuilder, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub type AppAuthService = AuthService<InMemoryUserRepository, LogMailer>;
pub type AppStoreService = StoreService<InMemoryItemRepository, InMemoryCartRepository>;

pub struct AppState {
    pub auth_service: Arc<AppAuthService>,
    pub store_service: AppStoreService,
}

// Uniform error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    fn message(&self) -> &str {
        match self {
            StoreError::Validation(msg)
            | StoreError::NotFound(msg)
            | StoreError::Unauthenticated(msg)
            | StoreError::Forbidden(msg)
            | StoreError::Database(msg)
            | StoreError::Internal(msg) => msg,
        }
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::Database(_) | StoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        if status.is_server_error() {
            error!(error = %error_msg, status = %status, "Request failed");
        } else {
            warn!(error = %error_msg, status = %status, "Request rejected");
        }

        let error_response = ErrorResponse {
            error: error_msg,
            details: serde_json::json!({ "message": self.message() }),
        };

        HttpResponse::build(status).json(error_response)
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Authentication(msg) => StoreError::Unauthenticated(msg),
            DomainError::Authorization(msg) => StoreError::Forbidden(msg),
            DomainError::Validation(msg) => StoreError::Validation(msg),
            DomainError::NotFound(msg) => StoreError::NotFound(msg),
            DomainError::Internal(msg) => StoreError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => domain.into(),
            Err(other) => StoreError::Database(other.to_string()),
        }
    }
}

// RequestContext extractor: resolves the session user recorded by SessionMiddleware
impl FromRequest for RequestContext {
    type Error = StoreError;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let user_id = req.extensions().get::<SessionUserId>().map(|s| s.0.clone());
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let state = state
                .ok_or_else(|| StoreError::Internal("Application state missing".to_string()))?;
            Ok(state.auth_service.resolve_context(user_id).await?)
        })
    }
}

/// Applies the cookie directives collected during a request to the response.
pub fn with_cookies(mut builder: HttpResponseBuilder, jar: CookieJar) -> HttpResponseBuilder {
    for directive in jar.into_directives() {
        match directive {
            CookieDirective::Set {
                name,
                value,
                options,
            } => {
                let max_age = CookieDuration::seconds(options.max_age.as_secs() as i64);
                builder.cookie(
                    Cookie::build(name, value)
                        .path("/")
                        .http_only(options.http_only)
                        .max_age(max_age)
                        .finish(),
                );
            }
            CookieDirective::Clear { name } => {
                let mut cookie = Cookie::build(name, "").path("/").finish();
                cookie.make_removal();
                builder.cookie(cookie);
            }
        }
    }
    builder
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
}

#[instrument]
pub async fn health_check() -> HttpResponse {
    info!("Health check requested");
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    };
    HttpResponse::Ok().json(response)
}

#[instrument(skip(state))]
pub async fn list_items(
    state: web::Data<AppState>,
    window: web::Query<ItemsWindow>,
) -> Result<HttpResponse, StoreError> {
    let items = state.store_service.list_items(window.into_inner()).await?;
    info!(count = items.len(), "Items listed");
    Ok(HttpResponse::Ok().json(items))
}

#[instrument(skip(state))]
pub async fn items_connection(state: web::Data<AppState>) -> Result<HttpResponse, StoreError> {
    let connection = state.store_service.items_connection().await?;
    Ok(HttpResponse::Ok().json(connection))
}

#[instrument(skip(state), fields(item_id = %*path))]
pub async fn get_item(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let item = state.store_service.get_item(&path).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(skip(state, ctx, req), fields(item_id))]
pub async fn create_item(
    state: web::Data<AppState>,
    ctx: RequestContext,
    req: web::Json<CreateItem>,
) -> Result<HttpResponse, StoreError> {
    let item = state
        .store_service
        .create_item(&ctx, req.into_inner())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create item");
            e
        })?;
    tracing::Span::current().record("item_id", item.id.as_str());
    Ok(HttpResponse::Created().json(item))
}

#[instrument(skip(state, ctx, req), fields(item_id = %*path))]
pub async fn update_item(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<UpdateItem>,
) -> Result<HttpResponse, StoreError> {
    let item = state
        .store_service
        .update_item(&ctx, &path, req.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(skip(state, ctx), fields(item_id = %*path))]
pub async fn delete_item(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let item = state.store_service.delete_item(&ctx, &path).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[instrument(skip(state, ctx))]
pub async fn cart(
    state: web::Data<AppState>,
    ctx: RequestContext,
) -> Result<HttpResponse, StoreError> {
    let lines = state.store_service.cart(&ctx).await?;
    Ok(HttpResponse::Ok().json(lines))
}

#[instrument(skip(state, ctx, req), fields(item_id = %req.item_id))]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    ctx: RequestContext,
    req: web::Json<AddToCart>,
) -> Result<HttpResponse, StoreError> {
    let cart_item = state
        .store_service
        .add_to_cart(&ctx, &req.item_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to add to cart");
            e
        })?;
    Ok(HttpResponse::Ok().json(cart_item))
}

#[instrument(skip(state, ctx), fields(cart_item_id = %*path))]
pub async fn remove_from_cart(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<String>,
) -> Result<HttpResponse, StoreError> {
    let cart_item = state.store_service.remove_from_cart(&ctx, &path).await?;
    Ok(HttpResponse::Ok().json(cart_item))
}
