//! In-memory store implementations for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Mutex;

use super::{LedgerStore, OrderStore, StoreError, UserStore};
use crate::model::{Balance, Order, OrderStatus, User, Withdrawal};

// ============================================================================
// Users
// ============================================================================

#[derive(Default)]
pub struct MockUserStore {
    pub users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.login == login) {
            return Err(StoreError::LoginAlreadyExists);
        }
        let id = users.len() as i64 + 1;
        users.push(User {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_by_login(&self, login: &str) -> Result<User, StoreError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.login == login)
            .cloned()
            .ok_or(StoreError::UserNotFound)
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Default)]
pub struct MockOrderStore {
    pub orders: Mutex<Vec<Order>>,
}

impl MockOrderStore {
    pub fn with_order(order: Order) -> Self {
        Self {
            orders: Mutex::new(vec![order]),
        }
    }

    pub fn get(&self, id: i64) -> Option<Order> {
        self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned()
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn create_order(&self, user_id: i64, number: &str) -> Result<i64, StoreError> {
        let mut orders = self.orders.lock().unwrap();
        if orders.iter().any(|o| o.number == number) {
            return Err(StoreError::NumberAlreadyExists);
        }
        let id = orders.len() as i64 + 1;
        orders.push(Order {
            id,
            user_id,
            number: number.to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
            last_checked_at: None,
            next_check_at: Some(Utc::now()),
            retry_count: 0,
        });
        Ok(id)
    }

    async fn get_by_number(&self, number: &str) -> Result<Order, StoreError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.number == number)
            .cloned()
            .ok_or(StoreError::OrderNotFound)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let mut result: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(result)
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| !o.status.is_terminal() && o.next_check_at.is_some_and(|at| at <= now))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound)?;
        order.status = status;
        order.accrual = accrual;
        Ok(())
    }

    async fn update_last_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound)?;
        order.last_checked_at = Some(at);
        Ok(())
    }

    async fn schedule(
        &self,
        id: i64,
        next_check_at: DateTime<Utc>,
        retry_count: i32,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound)?;
        order.next_check_at = Some(next_check_at);
        order.retry_count = retry_count;
        Ok(())
    }

    async fn mark_terminal(&self, id: i64) -> Result<(), StoreError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::OrderNotFound)?;
        order.next_check_at = None;
        Ok(())
    }
}

// ============================================================================
// Ledger
// ============================================================================

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub user_id: i64,
    pub kind: &'static str,
    pub order_number: String,
    pub amount: Decimal,
    pub processed_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MockLedgerStore {
    pub entries: Mutex<Vec<MockEntry>>,
}

impl MockLedgerStore {
    fn sums(entries: &[MockEntry], user_id: i64) -> (Decimal, Decimal) {
        let mut accrued = Decimal::ZERO;
        let mut withdrawn = Decimal::ZERO;
        for e in entries.iter().filter(|e| e.user_id == user_id) {
            match e.kind {
                "ACCRUAL" => accrued += e.amount,
                _ => withdrawn += e.amount,
            }
        }
        (accrued, withdrawn)
    }

    pub fn credit_count(&self, order_number: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == "ACCRUAL" && e.order_number == order_number)
            .count()
    }
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn balance(&self, user_id: i64) -> Result<Balance, StoreError> {
        let entries = self.entries.lock().unwrap();
        let (accrued, withdrawn) = Self::sums(&entries, user_id);
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
        let mut entries = self.entries.lock().unwrap();
        if entries
            .iter()
            .any(|e| e.kind == "ACCRUAL" && e.order_number == order_number)
        {
            return Err(StoreError::AccrualAlreadyExists);
        }
        entries.push(MockEntry {
            user_id,
            kind: "ACCRUAL",
            order_number: order_number.to_string(),
            amount,
            processed_at: Utc::now(),
        });
        Ok(())
    }

    async fn debit(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Decimal,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        if entries
            .iter()
            .any(|e| e.kind == "WITHDRAWAL" && e.order_number == order_number)
        {
            return Err(StoreError::OrderAlreadyWithdrawn);
        }
        let (accrued, withdrawn) = Self::sums(&entries, user_id);
        if accrued - withdrawn < amount {
            return Err(StoreError::InsufficientFunds);
        }
        entries.push(MockEntry {
            user_id,
            kind: "WITHDRAWAL",
            order_number: order_number.to_string(),
            amount,
            processed_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let entries = self.entries.lock().unwrap();
        let mut result: Vec<Withdrawal> = entries
            .iter()
            .filter(|e| e.user_id == user_id && e.kind == "WITHDRAWAL")
            .map(|e| Withdrawal {
                order: e.order_number.clone(),
                sum: e.amount,
                processed_at: e.processed_at,
            })
            .collect();
        result.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        Ok(result)
    }
}
