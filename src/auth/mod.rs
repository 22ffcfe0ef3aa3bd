//! JWT issuance, validation and the request-auth middleware.

pub mod jwt;
pub mod middleware;

pub use jwt::{AuthUser, Claims, JwtManager};
