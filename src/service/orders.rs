//! Order intake and listing.

use std::sync::Arc;

use crate::model::Order;
use crate::store::{OrderStore, StoreError};
use crate::validate::luhn;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("invalid order number")]
    InvalidOrderNumber,

    /// The same user already uploaded this number; the gateway answers
    /// 200 rather than an error status.
    #[error("order number already uploaded")]
    NumberAlreadyExists,

    #[error("order number belongs to another user")]
    OrderBelongsToAnother,

    #[error(transparent)]
    Store(StoreError),
}

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Accept an order number for accrual processing.
    ///
    /// On a number conflict a follow-up lookup distinguishes the
    /// harmless same-user duplicate from a cross-user conflict.
    pub async fn upload(&self, user_id: i64, number: &str) -> Result<i64, OrderError> {
        if !luhn(number) {
            return Err(OrderError::InvalidOrderNumber);
        }

        match self.orders.create_order(user_id, number).await {
            Ok(id) => Ok(id),
            Err(StoreError::NumberAlreadyExists) => {
                let existing = self
                    .orders
                    .get_by_number(number)
                    .await
                    .map_err(OrderError::Store)?;

                if existing.user_id == user_id {
                    Err(OrderError::NumberAlreadyExists)
                } else {
                    Err(OrderError::OrderBelongsToAnother)
                }
            }
            Err(e) => Err(OrderError::Store(e)),
        }
    }

    /// All orders of a user, newest first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<Order>, OrderError> {
        self.orders.list_by_user(user_id).await.map_err(OrderError::Store)
    }
}
