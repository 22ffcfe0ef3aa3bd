//! Accrual workers: apply queued credits to the ledger.
//!
//! A duplicate delivery (retry, restart, scheduler overlap) surfaces as
//! `AccrualAlreadyExists` and is the expected no-op, not an error.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::SharedReceiver;
use crate::model::CreditTask;
use crate::store::{LedgerStore, StoreError};

pub(super) async fn run(
    worker_id: usize,
    ledger: Arc<dyn LedgerStore>,
    rx: SharedReceiver<CreditTask>,
    task_timeout: Duration,
) {
    debug!(worker_id, "accrual worker started");

    loop {
        let task = { rx.lock().await.recv().await };
        let Some(task) = task else { break };

        let credit = ledger.credit(task.user_id, &task.order_number, task.amount);
        match tokio::time::timeout(task_timeout, credit).await {
            Ok(Ok(())) => {
                info!(order = %task.order_number, amount = %task.amount, "points credited")
            }
            Ok(Err(StoreError::AccrualAlreadyExists)) => {
                debug!(order = %task.order_number, "accrual already recorded, skipping")
            }
            Ok(Err(e)) => {
                error!(order = %task.order_number, error = %e, "failed to credit points")
            }
            Err(_) => warn!(order = %task.order_number, "credit task deadline exceeded"),
        }
    }

    debug!(worker_id, "accrual worker stopped");
}
