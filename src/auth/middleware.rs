use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::gateway::{state::AppState, types::ErrorBody};

/// Validate the `Authorization: Bearer <token>` header and inject the
/// authenticated identity as a typed [`AuthUser`](super::AuthUser)
/// extension. Protected handlers extract it by type, so a route wired
/// without this middleware fails at extraction rather than silently
/// serving another user's data.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let token = auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(unauthorized)?;

    match state.jwt.validate(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Err(_) => Err(unauthorized()),
    }
}

fn unauthorized() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("invalid or missing token")),
    )
}
