//! Order upload and listing handlers.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::error;

use crate::auth::AuthUser;
use crate::gateway::{state::AppState, types::ErrorBody};
use crate::service::OrderError;

/// Submit an order number for accrual processing.
///
/// POST /api/user/orders (body: order number as plain text)
/// 202 when accepted, 200 when this user already uploaded it.
#[utoipa::path(
    post,
    path = "/api/user/orders",
    request_body(content = String, content_type = "text/plain", description = "Order number"),
    responses(
        (status = 202, description = "Order accepted for processing"),
        (status = 200, description = "Order was already uploaded by this user"),
        (status = 400, description = "Empty body", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 409, description = "Order belongs to another user", body = ErrorBody),
        (status = 422, description = "Order number fails the Luhn check", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn upload_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: String,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    let number = body.trim();
    if number.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("order number is required")),
        ));
    }

    match state.orders.upload(user.user_id, number).await {
        Ok(_) => Ok(StatusCode::ACCEPTED),
        Err(OrderError::NumberAlreadyExists) => Ok(StatusCode::OK),
        Err(OrderError::InvalidOrderNumber) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody::new("invalid order number")),
        )),
        Err(OrderError::OrderBelongsToAnother) => Err((
            StatusCode::CONFLICT,
            Json(ErrorBody::new("order number belongs to another user")),
        )),
        Err(e) => {
            error!(error = %e, "order upload failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            ))
        }
    }
}

/// List this user's orders, newest first.
///
/// GET /api/user/orders
/// 204 with an empty body when there are none.
#[utoipa::path(
    get,
    path = "/api/user/orders",
    responses(
        (status = 200, description = "Orders, newest first", body = [crate::model::Order]),
        (status = 204, description = "No orders uploaded yet"),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    match state.orders.list(user.user_id).await {
        Ok(orders) if orders.is_empty() => Ok(StatusCode::NO_CONTENT.into_response()),
        Ok(orders) => Ok((StatusCode::OK, Json(orders)).into_response()),
        Err(e) => {
            error!(error = %e, "order listing failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new("internal server error")),
            ))
        }
    }
}
