//! Store traits for data access abstraction
//!
//! Services and the pipeline depend on these traits rather than on
//! Postgres directly, enabling mock implementations in tests and keeping
//! transactional invariants behind a narrow seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::model::{Balance, Order, OrderStatus, User, Withdrawal};

pub mod db;
pub mod ledger;
pub mod orders;
pub mod users;

#[cfg(test)]
pub mod mock;

pub use db::Database;
pub use ledger::PgLedgerStore;
pub use orders::PgOrderStore;
pub use users::PgUserStore;

/// Closed error taxonomy for store operations.
///
/// The conflict variants are part of the domain contract; everything the
/// database throws beyond them is passed through as `Sqlx`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("login already exists")]
    LoginAlreadyExists,

    #[error("user not found")]
    UserNotFound,

    #[error("order number already exists")]
    NumberAlreadyExists,

    #[error("order not found")]
    OrderNotFound,

    #[error("accrual already exists for order")]
    AccrualAlreadyExists,

    #[error("order already withdrawn")]
    OrderAlreadyWithdrawn,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("corrupt row: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

// ============================================================================
// User store
// ============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user; `LoginAlreadyExists` when the login is taken.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, StoreError>;

    /// Fetch a user by login; `UserNotFound` when absent.
    async fn get_by_login(&self, login: &str) -> Result<User, StoreError>;
}

// ============================================================================
// Order store
// ============================================================================

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order in status NEW, due for polling immediately.
    /// `NumberAlreadyExists` when the number is taken (by anyone).
    async fn create_order(&self, user_id: i64, number: &str) -> Result<i64, StoreError>;

    /// Fetch an order by its (globally unique) number.
    async fn get_by_number(&self, number: &str) -> Result<Order, StoreError>;

    /// All orders of a user, newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError>;

    /// Claim non-terminal orders due for polling. Concurrent callers see
    /// disjoint subsets (skip-locked semantics).
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError>;

    /// Record the remote-reported status and accrual amount.
    async fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<(), StoreError>;

    /// Stamp the last poll attempt.
    async fn update_last_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Plan the next poll and persist the retry counter.
    async fn schedule(
        &self,
        id: i64,
        next_check_at: DateTime<Utc>,
        retry_count: i32,
    ) -> Result<(), StoreError>;

    /// Clear `next_check_at` so the order is never claimed again.
    async fn mark_terminal(&self, id: i64) -> Result<(), StoreError>;
}

// ============================================================================
// Ledger store
// ============================================================================

/// Append-only ledger of point movements. Balances are derived by
/// aggregation; there is no stored balance column to drift.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current balance and lifetime withdrawn sum, from one aggregation.
    async fn balance(&self, user_id: i64) -> Result<Balance, StoreError>;

    /// Record an ACCRUAL entry. `AccrualAlreadyExists` when this order
    /// was already credited; safe under concurrent callers (the unique
    /// constraint is the source of truth, no pre-check).
    async fn credit(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    /// Record a WITHDRAWAL entry inside a transaction that re-checks the
    /// balance under a row lock. `InsufficientFunds` and
    /// `OrderAlreadyWithdrawn` are the domain outcomes.
    async fn debit(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<(), StoreError>;

    /// Withdrawals of a user, newest first.
    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, StoreError>;
}
