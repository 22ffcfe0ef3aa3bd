//! Balance queries and withdrawals.

use std::sync::Arc;

use crate::model::{Balance, Withdrawal, WithdrawRequest};
use crate::store::{LedgerStore, StoreError};
use crate::validate::luhn;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("invalid order number")]
    InvalidOrderNumber,

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("order already withdrawn")]
    OrderAlreadyWithdrawn,

    #[error(transparent)]
    Store(StoreError),
}

pub struct BalanceService {
    ledger: Arc<dyn LedgerStore>,
}

impl BalanceService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    pub async fn balance(&self, user_id: i64) -> Result<Balance, BalanceError> {
        self.ledger.balance(user_id).await.map_err(BalanceError::Store)
    }

    /// Spend points against an order number. The transactional balance
    /// re-check lives in the ledger store; this façade only screens out
    /// input a store round-trip cannot salvage.
    pub async fn withdraw(&self, user_id: i64, req: &WithdrawRequest) -> Result<(), BalanceError> {
        if !luhn(&req.order) {
            return Err(BalanceError::InvalidOrderNumber);
        }
        if req.sum <= Decimal::ZERO {
            return Err(BalanceError::InvalidAmount);
        }

        match self.ledger.debit(user_id, &req.order, req.sum).await {
            Ok(()) => Ok(()),
            Err(StoreError::InsufficientFunds) => Err(BalanceError::InsufficientFunds),
            Err(StoreError::OrderAlreadyWithdrawn) => Err(BalanceError::OrderAlreadyWithdrawn),
            Err(e) => Err(BalanceError::Store(e)),
        }
    }

    pub async fn withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>, BalanceError> {
        self.ledger
            .list_withdrawals(user_id)
            .await
            .map_err(BalanceError::Store)
    }
}
