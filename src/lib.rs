//! bonusd - loyalty points backend
//!
//! Customers submit order numbers; an external accrual service decides
//! how many points each order earns; users later spend points against
//! new orders. Balances are derived from an append-only ledger rather
//! than stored.
//!
//! # Modules
//!
//! - [`gateway`] - axum HTTP surface and auth middleware
//! - [`service`] - business-logic façades (auth, orders, balance)
//! - [`store`] - Postgres stores behind async traits
//! - [`pipeline`] - scheduler, status workers, accrual workers
//! - [`client`] - HTTP client for the external accrual service
//! - [`auth`] - JWT issuance and validation
//! - [`validate`] - Luhn and credential checks

pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod validate;

pub use config::Config;
pub use model::{Balance, CreditTask, Order, OrderStatus, User, Withdrawal};
