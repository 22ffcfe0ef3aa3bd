//! Wire types shared by handlers.

use serde::Serialize;
use utoipa::ToSchema;

/// JSON error body: `{"error": "<human message>"}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
