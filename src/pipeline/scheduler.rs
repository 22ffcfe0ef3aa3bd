//! Periodic claim loop: the single producer for the status queue.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::model::Order;
use crate::store::OrderStore;

/// Claim due orders every tick and offer them to the status workers.
/// Never calls external services, never blocks on the workers: a full
/// queue drops the order and the next tick re-claims it.
pub(super) async fn run(
    orders: Arc<dyn OrderStore>,
    status_tx: mpsc::Sender<Order>,
    mut stop: watch::Receiver<bool>,
    tick: Duration,
) {
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("scheduler started");

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let due = match orders.claim_due(Utc::now()).await {
                    Ok(due) => due,
                    Err(e) => {
                        warn!(error = %e, "failed to claim due orders");
                        continue;
                    }
                };
                if due.is_empty() {
                    continue;
                }

                let claimed = due.len();
                let mut deferred = 0usize;
                for order in due {
                    match status_tx.try_send(order) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => deferred += 1,
                        Err(TrySendError::Closed(_)) => {
                            info!("status queue closed, scheduler exiting");
                            return;
                        }
                    }
                }

                debug!(claimed, deferred, "scheduler tick");
            }
        }
    }

    info!("scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OrderStatus;
    use crate::store::mock::MockOrderStore;

    fn due_order(id: i64, number: &str) -> Order {
        Order {
            id,
            user_id: 1,
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
    async fn dispatches_due_orders_and_stops_on_signal() {
        let store = Arc::new(MockOrderStore::with_order(due_order(1, "79927398713")));
        let (tx, mut rx) = mpsc::channel::<Order>(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run(store, tx, stop_rx, Duration::from_millis(10)));

        let order = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("scheduler should dispatch within the first ticks")
            .unwrap();
        assert_eq!(order.number, "79927398713");

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn full_queue_drops_without_touching_next_check_at() {
        let store = Arc::new(MockOrderStore::default());
        {
            let mut orders = store.orders.lock().unwrap();
            orders.push(due_order(1, "79927398713"));
            orders.push(due_order(2, "4561261212345467"));
        }

        let (tx, mut rx) = mpsc::channel::<Order>(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(store.clone(), tx, stop_rx, Duration::from_millis(10)));

        // take only the first; the second dispatch finds the queue full
        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        let _ = handle.await;

        let dropped_id = if first.id == 1 { 2 } else { 1 };
        let dropped = store.get(dropped_id).unwrap();
        assert!(
            dropped.next_check_at.is_some_and(|at| at <= Utc::now()),
            "a deferred order stays due for the next tick"
        );
    }
}
