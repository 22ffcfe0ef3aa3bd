//! Business-logic façades between the HTTP gateway and the stores.

pub mod auth;
pub mod balance;
pub mod orders;

pub use auth::{AuthError, AuthService};
pub use balance::{BalanceError, BalanceService};
pub use orders::{OrderError, OrderService};
