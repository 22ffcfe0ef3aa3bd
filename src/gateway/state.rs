use crate::auth::JwtManager;
use crate::service::{AuthService, BalanceService, OrderService};

/// Shared gateway state: the service façades plus the token validator
/// the auth middleware runs against.
pub struct AppState {
    pub auth: AuthService,
    pub orders: OrderService,
    pub balance: BalanceService,
    pub jwt: JwtManager,
}
