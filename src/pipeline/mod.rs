//! Asynchronous order reconciliation pipeline.
//!
//! ```text
//!            claim_due (tick)            poll accrual
//! OrderStore ───────────▶ status queue ──▶ status workers ──▶ OrderStore
//!                         (bounded)            │
//!                                              │ PROCESSED + amount
//!                                              ▼
//!                                        credit queue ──▶ accrual workers ──▶ LedgerStore
//!                                         (bounded)
//! ```
//!
//! The scheduler never blocks: both queues are offered to with
//! `try_send`, and a full queue just defers the order to the next tick
//! (its `next_check_at` is untouched until a worker reschedules it).

pub mod backoff;

mod accrual;
mod scheduler;
mod status;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::client::AccrualApi;
use crate::model::{CreditTask, Order};
use crate::store::{LedgerStore, OrderStore};

const SCHEDULER_TICK: Duration = Duration::from_secs(10);

/// Multiple workers drain one queue; the mutex is only held across the
/// `recv` itself, never across task processing.
pub(crate) type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub queue_size: usize,
    pub status_workers: usize,
    pub accrual_workers: usize,
    pub task_timeout: Duration,
    pub tick: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            queue_size: config.queue_size,
            status_workers: config.worker_count,
            accrual_workers: config.worker_count,
            task_timeout: config.worker_timeout,
            tick: SCHEDULER_TICK,
        }
    }
}

/// Running pipeline: one scheduler, two bounded queues, two worker
/// pools. Dropping this without calling [`Pipeline::shutdown`] aborts
/// nothing; shutdown is explicit so the termination order is too.
pub struct Pipeline {
    stop: watch::Sender<bool>,
    scheduler: JoinHandle<()>,
    status_workers: Vec<JoinHandle<()>>,
    accrual_workers: Vec<JoinHandle<()>>,
    status_tx: mpsc::Sender<Order>,
    credit_tx: mpsc::Sender<CreditTask>,
}

impl Pipeline {
    pub fn spawn(
        orders: Arc<dyn OrderStore>,
        ledger: Arc<dyn LedgerStore>,
        accrual: Arc<dyn AccrualApi>,
        config: PipelineConfig,
    ) -> Self {
        let (status_tx, status_rx) = mpsc::channel::<Order>(config.queue_size);
        let (credit_tx, credit_rx) = mpsc::channel::<CreditTask>(config.queue_size);
        let (stop, stop_rx) = watch::channel(false);

        let scheduler = tokio::spawn(scheduler::run(
            orders.clone(),
            status_tx.clone(),
            stop_rx,
            config.tick,
        ));

        let status_rx: SharedReceiver<Order> = Arc::new(Mutex::new(status_rx));
        let status_workers = (0..config.status_workers)
            .map(|worker_id| {
                let worker = status::StatusWorker {
                    orders: orders.clone(),
                    ledger: ledger.clone(),
                    accrual: accrual.clone(),
                    credit_tx: credit_tx.clone(),
                    task_timeout: config.task_timeout,
                };
                tokio::spawn(status::run(worker_id, worker, status_rx.clone()))
            })
            .collect();

        let credit_rx: SharedReceiver<CreditTask> = Arc::new(Mutex::new(credit_rx));
        let accrual_workers = (0..config.accrual_workers)
            .map(|worker_id| {
                tokio::spawn(accrual::run(
                    worker_id,
                    ledger.clone(),
                    credit_rx.clone(),
                    config.task_timeout,
                ))
            })
            .collect();

        info!(
            status_workers = config.status_workers,
            accrual_workers = config.accrual_workers,
            queue_size = config.queue_size,
            "pipeline started"
        );

        Self {
            stop,
            scheduler,
            status_workers,
            accrual_workers,
            status_tx,
            credit_tx,
        }
    }

    /// Stop the pipeline, draining what is already queued.
    ///
    /// The order is load-bearing: the scheduler must have returned
    /// before the status queue closes (it still writes to it), and the
    /// status workers must have returned before the credit queue closes
    /// (they still write to that one).
    pub async fn shutdown(self) {
        let Pipeline {
            stop,
            scheduler,
            status_workers,
            accrual_workers,
            status_tx,
            credit_tx,
        } = self;

        let _ = stop.send(true);
        let _ = scheduler.await;

        drop(status_tx);
        for handle in status_workers {
            let _ = handle.await;
        }

        drop(credit_tx);
        for handle in accrual_workers {
            let _ = handle.await;
        }

        info!("pipeline stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AccrualResponse, AccrualStatus, ClientError};
    use crate::model::OrderStatus;
    use crate::store::mock::{MockLedgerStore, MockOrderStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Mutex as StdMutex;

    struct ScriptedAccrual {
        responses: StdMutex<Vec<Result<AccrualResponse, ClientError>>>,
    }

    #[async_trait]
    impl AccrualApi for ScriptedAccrual {
        async fn get_order(&self, _number: &str) -> Result<AccrualResponse, ClientError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Err(ClientError::Unavailable)
            } else {
                responses.remove(0)
            }
        }

        async fn register_order(&self, _number: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn due_order(id: i64, user_id: i64, number: &str) -> crate::model::Order {
        crate::model::Order {
            id,
            user_id,
            number: number.to_string(),
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
            last_checked_at: None,
            next_check_at: Some(Utc::now()),
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn end_to_end_claim_poll_credit_terminate() {
        let orders = Arc::new(MockOrderStore::with_order(due_order(1, 7, "79927398713")));
        let ledger = Arc::new(MockLedgerStore::default());
        let accrual = Arc::new(ScriptedAccrual {
            responses: StdMutex::new(vec![Ok(AccrualResponse {
                order: "79927398713".to_string(),
                status: AccrualStatus::Processed,
                accrual: Some(dec!(1500.50)),
            })]),
        });

        let pipeline = Pipeline::spawn(
            orders.clone(),
            ledger.clone(),
            accrual,
            PipelineConfig {
                queue_size: 8,
                status_workers: 2,
                accrual_workers: 2,
                task_timeout: Duration::from_secs(5),
                tick: Duration::from_millis(20),
            },
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        pipeline.shutdown().await;

        let order = orders.get(1).unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual, Some(dec!(1500.50)));
        assert!(order.next_check_at.is_none(), "terminal orders are never claimed again");

        assert_eq!(ledger.credit_count("79927398713"), 1);
        assert_eq!(ledger.balance(7).await.unwrap().current, dec!(1500.50));
    }

    #[tokio::test]
    async fn shutdown_completes_with_idle_workers() {
        let orders = Arc::new(MockOrderStore::default());
        let ledger = Arc::new(MockLedgerStore::default());
        let accrual = Arc::new(ScriptedAccrual {
            responses: StdMutex::new(vec![]),
        });

        let pipeline = Pipeline::spawn(
            orders,
            ledger,
            accrual,
            PipelineConfig {
                queue_size: 4,
                status_workers: 3,
                accrual_workers: 3,
                task_timeout: Duration::from_secs(5),
                tick: Duration::from_secs(60),
            },
        );

        tokio::time::timeout(Duration::from_secs(5), pipeline.shutdown())
            .await
            .expect("shutdown must not hang");
    }
}
