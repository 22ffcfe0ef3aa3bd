//! Status workers: poll the accrual service for claimed orders and
//! drive them toward a terminal state.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use super::{backoff, SharedReceiver};
use crate::client::{AccrualApi, AccrualResponse, ClientError};
use crate::model::{CreditTask, Order, OrderStatus};
use crate::store::{LedgerStore, OrderStore, StoreError};

fn next_at(delay: Duration) -> chrono::DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(300))
}

pub(super) struct StatusWorker {
    pub(super) orders: Arc<dyn OrderStore>,
    pub(super) ledger: Arc<dyn LedgerStore>,
    pub(super) accrual: Arc<dyn AccrualApi>,
    pub(super) credit_tx: mpsc::Sender<CreditTask>,
    pub(super) task_timeout: Duration,
}

pub(super) async fn run(worker_id: usize, worker: StatusWorker, rx: SharedReceiver<Order>) {
    debug!(worker_id, "status worker started");

    loop {
        let order = { rx.lock().await.recv().await };
        let Some(order) = order else { break };

        match tokio::time::timeout(worker.task_timeout, worker.process(&order)).await {
            Ok(()) => {}
            Err(_) => {
                warn!(order = %order.number, "status task deadline exceeded");
                // the poll may have died anywhere; treat it as one more
                // failed attempt so the backoff curve still applies
                let retry_count = order.retry_count + 1;
                let next_check_at = next_at(backoff::next_check_delay(retry_count, None));
                if let Err(e) = worker.orders.schedule(order.id, next_check_at, retry_count).await {
                    error!(order = %order.number, error = %e, "failed to reschedule after timeout");
                }
            }
        }
    }

    debug!(worker_id, "status worker stopped");
}

impl StatusWorker {
    async fn process(&self, order: &Order) {
        if let Err(e) = self.orders.update_last_checked(order.id, Utc::now()).await {
            error!(order = %order.number, error = %e, "failed to stamp last check");
        }

        match self.accrual.get_order(&order.number).await {
            Ok(resp) => self.apply_response(order, resp).await,
            Err(err) => self.handle_poll_error(order, err).await,
        }
    }

    async fn handle_poll_error(&self, order: &Order, mut err: ClientError) {
        if matches!(err, ClientError::OrderNotRegistered) {
            info!(order = %order.number, "order unknown to accrual, registering");
            match self.accrual.register_order(&order.number).await {
                Ok(()) => info!(order = %order.number, "order registered in accrual"),
                Err(reg_err) => {
                    warn!(order = %order.number, error = %reg_err, "failed to register order in accrual");
                    err = reg_err;
                }
            }
        }

        let retry_count = order.retry_count + 1;
        let next_check_at = next_at(backoff::next_check_delay(retry_count, Some(&err)));
        if let Err(e) = self.orders.schedule(order.id, next_check_at, retry_count).await {
            error!(order = %order.number, error = %e, "failed to schedule next check");
        }
    }

    async fn apply_response(&self, order: &Order, resp: AccrualResponse) {
        let status = OrderStatus::from(resp.status);
        match self.orders.update_status(order.id, status, resp.accrual).await {
            Ok(()) => info!(
                order = %order.number,
                status = status.as_str(),
                accrual = ?resp.accrual,
                "status updated"
            ),
            Err(e) => error!(order = %order.number, error = %e, "failed to update order status"),
        }

        if status.is_terminal() {
            // credit exactly once: only on the transition into PROCESSED
            if status == OrderStatus::Processed
                && order.status != OrderStatus::Processed
            {
                if let Some(amount) = resp.accrual {
                    self.submit_credit(CreditTask {
                        user_id: order.user_id,
                        order_number: order.number.clone(),
                        amount,
                    })
                    .await;
                }
            }

            if let Err(e) = self.orders.mark_terminal(order.id).await {
                error!(order = %order.number, error = %e, "failed to mark order terminal");
            }
        } else {
            // remote is healthy but not done yet: poll again at the base
            // delay with the retry counter reset
            let next_check_at = next_at(backoff::BASE_POLL_DELAY);
            if let Err(e) = self.orders.schedule(order.id, next_check_at, 0).await {
                error!(order = %order.number, error = %e, "failed to schedule next check");
            }
        }
    }

    /// Offer the credit to the accrual pool; if the queue is saturated
    /// (or already draining), credit synchronously through the same
    /// ledger capability instead of losing the task.
    async fn submit_credit(&self, task: CreditTask) {
        match self.credit_tx.try_send(task) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) | Err(TrySendError::Closed(task)) => {
                match self
                    .ledger
                    .credit(task.user_id, &task.order_number, task.amount)
                    .await
                {
                    Ok(()) => info!(order = %task.order_number, "points credited directly"),
                    Err(StoreError::AccrualAlreadyExists) => {
                        debug!(order = %task.order_number, "accrual already recorded")
                    }
                    Err(e) => error!(order = %task.order_number, error = %e, "direct credit failed"),
                }
            }
        }
    }
}
