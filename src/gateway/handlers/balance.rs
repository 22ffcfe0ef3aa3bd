//! Balance, withdrawal and withdrawal-history handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::error;

use crate::auth::AuthUser;
use crate::gateway::{state::AppState, types::ErrorBody};
use crate::model::{Balance, WithdrawRequest};
use crate::service::BalanceError;

/// Current balance and lifetime withdrawn sum.
///
/// GET /api/user/balance
#[utoipa::path(
    get,
    path = "/api/user/balance",
    responses(
        (status = 200, description = "Current balance", body = Balance),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "balance"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Balance>, (StatusCode, Json<ErrorBody>)> {
    match state.balance.balance(user.user_id).await {
        Ok(balance) => Ok(Json(balance)),
        Err(e) => {
            error!(error = %e, "balance query failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            ))
        }
    }
}

/// Spend points against an order number.
///
/// POST /api/user/balance/withdraw
#[utoipa::path(
    post,
    path = "/api/user/balance/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Points withdrawn"),
        (status = 400, description = "Invalid body or non-positive sum", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 402, description = "Insufficient funds", body = ErrorBody),
        (status = 409, description = "Order already used for a withdrawal", body = ErrorBody),
        (status = 422, description = "Order number fails the Luhn check", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "balance"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let Json(req) = payload.map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("invalid request body")),
        )
    })?;

    match state.balance.withdraw(user.user_id, &req).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(BalanceError::InvalidAmount) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("amount must be positive")),
        )),
        Err(BalanceError::InvalidOrderNumber) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody::new("invalid order number")),
        )),
        Err(BalanceError::InsufficientFunds) => Err((
            StatusCode::PAYMENT_REQUIRED,
            Json(ErrorBody::new("insufficient funds")),
        )),
        Err(BalanceError::OrderAlreadyWithdrawn) => Err((
            StatusCode::CONFLICT,
            Json(ErrorBody::new("order already withdrawn")),
        )),
        Err(e) => {
            error!(error = %e, "withdrawal failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            ))
        }
    }
}

/// Withdrawal history, newest first.
///
/// GET /api/user/withdrawals
/// 204 with an empty body when there are none.
#[utoipa::path(
    get,
    path = "/api/user/withdrawals",
    responses(
        (status = 200, description = "Withdrawals, newest first", body = [crate::model::Withdrawal]),
        (status = 204, description = "No withdrawals yet"),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "balance"
)]
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    match state.balance.withdrawals(user.user_id).await {
        Ok(withdrawals) if withdrawals.is_empty() => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(withdrawals) => Ok((StatusCode::OK, Json(withdrawals)).into_response()),
        Err(e) => {
            error!(error = %e, "withdrawal listing failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            ))
        }
    }
}
