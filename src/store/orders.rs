//! Postgres-backed order store with the fair claim query used by the
//! scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{OrderStore, StoreError};
use crate::model::{Order, OrderStatus};

const ORDER_COLUMNS: &str =
    "id, user_id, number, status, accrual, uploaded_at, last_checked_at, next_check_at, retry_count";

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: &PgRow) -> Result<Order, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<OrderStatus>().map_err(StoreError::Decode)?;

    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        number: row.try_get("number")?,
        status,
        accrual: row.try_get("accrual")?,
        uploaded_at: row.try_get("uploaded_at")?,
        last_checked_at: row.try_get("last_checked_at")?,
        next_check_at: row.try_get("next_check_at")?,
        retry_count: row.try_get("retry_count")?,
    })
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(&self, user_id: i64, number: &str) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"INSERT INTO orders (user_id, number)
               VALUES ($1, $2)
               ON CONFLICT (number) DO NOTHING
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.get("id")),
            None => Err(StoreError::NumberAlreadyExists),
        }
    }

    async fn get_by_number(&self, number: &str) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE number = $1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_order(&row),
            None => Err(StoreError::OrderNotFound),
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    // SKIP LOCKED makes concurrent claimers see disjoint row sets within
    // the same tick; the claim itself leaves next_check_at untouched so
    // a queue-full drop is retried on the next tick.
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders
               WHERE status IN ('NEW', 'PROCESSING')
                 AND next_check_at <= $1
               ORDER BY next_check_at
               FOR UPDATE SKIP LOCKED"#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET status = $1, accrual = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(accrual)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_last_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET last_checked_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn schedule(
        &self,
        id: i64,
        next_check_at: DateTime<Utc>,
        retry_count: i32,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET next_check_at = $1, retry_count = $2 WHERE id = $3")
            .bind(next_check_at)
            .bind(retry_count)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_terminal(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET next_check_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
