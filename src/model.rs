//! Data model shared across stores, services and the pipeline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Order lifecycle status.
///
/// `Processed` and `Invalid` are terminal: the order is excluded from
/// further polling once either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Processing,
    Processed,
    Invalid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Processed => "PROCESSED",
            OrderStatus::Invalid => "INVALID",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Processed | OrderStatus::Invalid)
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(OrderStatus::New),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "PROCESSED" => Ok(OrderStatus::Processed),
            "INVALID" => Ok(OrderStatus::Invalid),
            other => Err(format!("unknown order status '{other}'")),
        }
    }
}

/// Registered user. Immutable after creation.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A submitted order with its polling metadata.
///
/// Only `number`, `status`, `accrual` and `uploaded_at` are part of the
/// API surface; the remaining fields drive the reconciliation pipeline.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Order {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub next_check_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub retry_count: i32,
}

/// Derived balance: `current` is the accrual sum minus the withdrawal
/// sum, `withdrawn` the withdrawal sum alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Balance {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

/// A recorded withdrawal, as returned by `GET /api/user/withdrawals`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Withdrawal {
    pub order: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

/// Body of `POST /api/user/register` and `POST /api/user/login`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthRequest {
    pub login: String,
    pub password: String,
}

/// Body of `POST /api/user/balance/withdraw`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

/// Credit handed from a status worker to the accrual worker pool once an
/// order reaches `PROCESSED` with a non-null amount.
#[derive(Debug, Clone)]
pub struct CreditTask {
    pub user_id: i64,
    pub order_number: String,
    pub amount: Decimal,
}
