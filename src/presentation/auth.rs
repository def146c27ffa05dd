use crate::domain::context::RequestContext;
use crate::domain::session::CookieJar;
use crate::domain::user::{
    RequestResetRequest, ResetPasswordRequest, SigninRequest, SignupRequest,
    UpdatePermissionsRequest,
};
use crate::presentation::handlers::{AppState, StoreError, with_cookies};
use actix_web::{HttpResponse, web};
use tracing::{error, info, instrument};

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn signup(
    state: web::Data<AppState>,
    req: web::Json<SignupRequest>,
) -> Result<HttpResponse, StoreError> {
    info!("Signup request received");
    let mut jar = CookieJar::new();

    let user = state
        .auth_service
        .signup(req.into_inner(), &mut jar)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to sign up");
            StoreError::from(e)
        })?;

    Ok(with_cookies(HttpResponse::Created(), jar).json(user))
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn signin(
    state: web::Data<AppState>,
    req: web::Json<SigninRequest>,
) -> Result<HttpResponse, StoreError> {
    info!("Signin request received");
    let mut jar = CookieJar::new();

    let user = state
        .auth_service
        .signin(req.into_inner(), &mut jar)
        .await?;

    Ok(with_cookies(HttpResponse::Ok(), jar).json(user))
}

#[instrument(skip(state))]
pub async fn signout(state: web::Data<AppState>) -> HttpResponse {
    let mut jar = CookieJar::new();
    let payload = state.auth_service.signout(&mut jar);
    with_cookies(HttpResponse::Ok(), jar).json(payload)
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn request_reset(
    state: web::Data<AppState>,
    req: web::Json<RequestResetRequest>,
) -> Result<HttpResponse, StoreError> {
    let payload = state.auth_service.request_reset(req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(payload))
}

#[instrument(skip(state, req))]
pub async fn reset_password(
    state: web::Data<AppState>,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, StoreError> {
    let mut jar = CookieJar::new();
    let user = state
        .auth_service
        .reset_password(req.into_inner(), &mut jar)
        .await?;
    Ok(with_cookies(HttpResponse::Ok(), jar).json(user))
}

#[instrument(skip(state, ctx))]
pub async fn me(state: web::Data<AppState>, ctx: RequestContext) -> HttpResponse {
    HttpResponse::Ok().json(state.auth_service.me(&ctx))
}

#[instrument(skip(state, ctx))]
pub async fn users(
    state: web::Data<AppState>,
    ctx: RequestContext,
) -> Result<HttpResponse, StoreError> {
    let users = state.auth_service.users(&ctx).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[instrument(skip(state, ctx, req), fields(target_user_id = %*path))]
pub async fn update_permissions(
    state: web::Data<AppState>,
    ctx: RequestContext,
    path: web::Path<String>,
    req: web::Json<UpdatePermissionsRequest>,
) -> Result<HttpResponse, StoreError> {
    let user = state
        .auth_service
        .update_permissions(&ctx, &path, req.into_inner().permissions)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}
