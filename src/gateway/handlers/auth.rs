//! Registration and login handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;
use tracing::warn;

use crate::gateway::{state::AppState, types::ErrorBody};
use crate::model::AuthRequest;
use crate::service::AuthError;

/// Register a new user.
///
/// POST /api/user/register
/// Success: 200 OK with `Authorization: Bearer <token>`.
#[utoipa::path(
    post,
    path = "/api/user/register",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Registered; token in the Authorization response header"),
        (status = 400, description = "Invalid request body or credentials", body = ErrorBody),
        (status = 409, description = "Login already exists", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let Json(req) = payload.map_err(|_| bad_request("invalid request body"))?;

    match state.auth.register(&req.login, &req.password).await {
        Ok(token) => Ok(bearer_response(&token)),
        Err(e) => Err(map_auth_error(e, "registration")),
    }
}

/// Authenticate an existing user.
///
/// POST /api/user/login
/// Success: 200 OK with `Authorization: Bearer <token>`.
#[utoipa::path(
    post,
    path = "/api/user/login",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Authenticated; token in the Authorization response header"),
        (status = 400, description = "Invalid request body", body = ErrorBody),
        (status = 401, description = "Invalid login or password", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let Json(req) = payload.map_err(|_| bad_request("invalid request body"))?;

    match state.auth.login(&req.login, &req.password).await {
        Ok(token) => Ok(bearer_response(&token)),
        Err(e) => Err(map_auth_error(e, "login")),
    }
}

fn bearer_response(token: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::AUTHORIZATION, format!("Bearer {token}"))],
    )
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message)))
}

fn map_auth_error(err: AuthError, op: &str) -> (StatusCode, Json<ErrorBody>) {
    match err {
        AuthError::Validation(e) => (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))),
        AuthError::LoginAlreadyExists => (
            StatusCode::CONFLICT,
            Json(ErrorBody::new("login already exists")),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody::new("invalid login or password")),
        ),
        e => {
            warn!(error = %e, "{op} failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            )
        }
    }
}
