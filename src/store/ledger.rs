//! Postgres-backed ledger store.
//!
//! The `(order_number, type)` unique constraint is the at-most-once
//! guarantee for credits; the debit transaction serializes concurrent
//! withdrawals of one user behind a row lock before re-checking the
//! balance it is about to spend.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use super::{LedgerStore, StoreError};
use crate::model::{Balance, Withdrawal};

pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn balance(&self, user_id: i64) -> Result<Balance, StoreError> {
        let row = sqlx::query(
            r#"SELECT
                 COALESCE(SUM(CASE WHEN type = 'ACCRUAL' THEN amount ELSE 0 END), 0) AS accrued,
                 COALESCE(SUM(CASE WHEN type = 'WITHDRAWAL' THEN amount ELSE 0 END), 0) AS withdrawn
               FROM balance_transactions
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let accrued: Decimal = row.get("accrued");
        let withdrawn: Decimal = row.get("withdrawn");

        Ok(Balance {
            current: accrued - withdrawn,
            withdrawn,
        })
    }

    async fn credit(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"INSERT INTO balance_transactions (user_id, type, order_number, amount)
               VALUES ($1, 'ACCRUAL', $2, $3)
               ON CONFLICT (order_number, type) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AccrualAlreadyExists);
        }
        Ok(())
    }

    async fn debit(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let already_withdrawn: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                 SELECT 1 FROM balance_transactions
                 WHERE order_number = $1 AND type = 'WITHDRAWAL'
               )"#,
        )
        .bind(order_number)
        .fetch_one(&mut *tx)
        .await?;

        if already_withdrawn {
            return Err(StoreError::OrderAlreadyWithdrawn);
        }

        // Lock this user's ledger rows so concurrent debits serialize;
        // the balance check below is only valid under this lock.
        sqlx::query("SELECT 1 FROM balance_transactions WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        let current: Decimal = sqlx::query_scalar(
            r#"SELECT
                 COALESCE(SUM(CASE WHEN type = 'ACCRUAL' THEN amount END), 0) -
                 COALESCE(SUM(CASE WHEN type = 'WITHDRAWAL' THEN amount END), 0)
               FROM balance_transactions
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if current < amount {
            return Err(StoreError::InsufficientFunds);
        }

        sqlx::query(
            r#"INSERT INTO balance_transactions (user_id, type, order_number, amount)
               VALUES ($1, 'WITHDRAWAL', $2, $3)"#,
        )
        .bind(user_id)
        .bind(order_number)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT order_number, amount, processed_at
               FROM balance_transactions
               WHERE user_id = $1 AND type = 'WITHDRAWAL'
               ORDER BY processed_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Withdrawal {
                order: row.get("order_number"),
                sum: row.get("amount"),
                processed_at: row.get("processed_at"),
            })
            .collect())
    }
}
