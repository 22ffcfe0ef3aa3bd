//! OpenAPI documentation for the loyalty API.
//!
//! Served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::types::ErrorBody;
use crate::model::{AuthRequest, Balance, Order, OrderStatus, WithdrawRequest, Withdrawal};

/// JWT bearer security scheme; tokens come from register/login.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "bonusd loyalty API",
        version = "0.1.0",
        description = "Loyalty points backend: order intake, accrual reconciliation, balance ledger."
    ),
    paths(
        crate::gateway::handlers::auth::register,
        crate::gateway::handlers::auth::login,
        crate::gateway::handlers::orders::upload_order,
        crate::gateway::handlers::orders::list_orders,
        crate::gateway::handlers::balance::get_balance,
        crate::gateway::handlers::balance::withdraw,
        crate::gateway::handlers::balance::list_withdrawals,
        crate::gateway::handlers::health,
    ),
    components(schemas(
        AuthRequest,
        WithdrawRequest,
        Order,
        OrderStatus,
        Balance,
        Withdrawal,
        ErrorBody
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "orders", description = "Order upload and listing"),
        (name = "balance", description = "Balance, withdrawals and history"),
        (name = "ops", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;
