//! Mutation Outbox
//!
//! Remote mutations are queued on an unbounded channel and applied one at a
//! time, in enqueue order, by a single worker task. Each queued mutation
//! reports its outcome through a oneshot channel wrapped in a
//! [`MutationTicket`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::commands::{ApiError, Mutation, RemoteBackend};

type Outcome = Result<(), ApiError>;

struct Job {
    mutation: Mutation,
    done: oneshot::Sender<Outcome>,
}

/// Handle on one queued mutation. Dropping it ignores the outcome.
#[derive(Debug)]
pub struct MutationTicket {
    rx: oneshot::Receiver<Outcome>,
}

impl MutationTicket {
    /// Wait until the worker has applied (or failed) the mutation
    pub async fn outcome(self) -> Outcome {
        self.rx.await.unwrap_or(Err(ApiError::Closed))
    }

    fn closed() -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(ApiError::Closed));
        Self { rx }
    }
}

pub struct Outbox {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

impl Outbox {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteBackend>) -> Self {
        let (sender, mut rx) = mpsc::unbounded_channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));
        let counter = pending.clone();

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let table = job.mutation.table().name();
                let action = job.mutation.action();
                let result = remote.apply_mutation(&job.mutation).await;
                if let Err(e) = &result {
                    log::error!("Remote {} on {} failed: {}", action, table, e);
                }
                counter.fetch_sub(1, Ordering::SeqCst);
                let _ = job.done.send(result);
            }
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            pending,
        }
    }

    pub fn enqueue(&self, mutation: Mutation) -> MutationTicket {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            log::warn!("Outbox closed, dropping {} on {}", mutation.action(), mutation.table().name());
            return MutationTicket::closed();
        };

        let (done, rx) = oneshot::channel();
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(rejected) = sender.send(Job { mutation, done }) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            let _ = rejected.0.done.send(Err(ApiError::Closed));
        }
        MutationTicket { rx }
    }

    /// Queued plus in-flight mutations
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting mutations and wait for the queue to drain
    pub async fn close(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                log::error!("Outbox worker stopped abnormally: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::models::{Ledger, WorkDay};
    use std::time::Duration;

    /// Records mutations; fails those on the "broken" date.
    struct Recorder {
        applied: Mutex<Vec<Mutation>>,
        delay: Duration,
    }

    #[async_trait]
    impl RemoteBackend for Recorder {
        async fn fetch_snapshot(&self) -> Result<Ledger, ApiError> {
            Ok(Ledger::default())
        }

        async fn apply_mutation(&self, mutation: &Mutation) -> Result<(), ApiError> {
            tokio::time::sleep(self.delay).await;
            if mutation.payload().get("date").and_then(|d| d.as_str()) == Some("broken") {
                return Err(ApiError::Status {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            self.applied.lock().unwrap().push(mutation.clone());
            Ok(())
        }
    }

    fn recorder(delay_ms: u64) -> Arc<Recorder> {
        Arc::new(Recorder {
            applied: Mutex::new(Vec::new()),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_drains_in_enqueue_order() {
        let remote = recorder(5);
        let outbox = Outbox::spawn(remote.clone());

        let dates = ["2025-03-03", "2025-03-04", "2025-03-05"];
        let tickets: Vec<_> = dates
            .iter()
            .map(|d| outbox.enqueue(Mutation::upsert_work_day(&WorkDay::not_worked(*d))))
            .collect();
        assert_eq!(outbox.pending(), 3);

        for ticket in tickets {
            ticket.outcome().await.unwrap();
        }
        assert_eq!(outbox.pending(), 0);

        let applied = remote.applied.lock().unwrap();
        let order: Vec<&str> = applied
            .iter()
            .map(|m| m.payload()["date"].as_str().unwrap())
            .collect();
        assert_eq!(order, dates);
    }

    #[tokio::test]
    async fn test_failure_is_reported_on_ticket_only() {
        let remote = recorder(0);
        let outbox = Outbox::spawn(remote.clone());

        let failed = outbox.enqueue(Mutation::upsert_work_day(&WorkDay::not_worked("broken")));
        let ok = outbox.enqueue(Mutation::delete_work_day("2025-03-03"));

        assert!(matches!(failed.outcome().await, Err(ApiError::Status { status: 500, .. })));
        assert!(ok.outcome().await.is_ok());
    }

    #[tokio::test]
    async fn test_close_drains_then_rejects() {
        let remote = recorder(5);
        let outbox = Outbox::spawn(remote.clone());

        let _ignored = outbox.enqueue(Mutation::delete_client("a"));
        let _ignored = outbox.enqueue(Mutation::delete_client("b"));
        outbox.close().await;

        assert_eq!(remote.applied.lock().unwrap().len(), 2);
        assert_eq!(outbox.pending(), 0);

        let late = outbox.enqueue(Mutation::delete_client("c"));
        assert_eq!(late.outcome().await, Err(ApiError::Closed));
    }
}
