//! Periodic recovery sweep.
//!
//! Finds paid sessions that never reached a finished report (flagged by the
//! webhook handler, ended in `error`, or stuck mid-pipeline past the
//! staleness window) and feeds them back into the generation queue.

use std::sync::Arc;
use std::time::Duration;

use report_flow::{GenerationQueue, SessionPatch, SessionStore};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub struct RetrySweep {
    store: Arc<dyn SessionStore>,
    queue: GenerationQueue,
    interval: Duration,
    stale_after: Duration,
    batch: usize,
}

impl RetrySweep {
    pub fn new(
        store: Arc<dyn SessionStore>,
        queue: GenerationQueue,
        interval: Duration,
        stale_after: Duration,
        batch: usize,
    ) -> Self {
        Self {
            store,
            queue,
            interval,
            stale_after,
            batch,
        }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(requeued) => info!(requeued, "retry sweep re-queued sessions"),
                Err(e) => error!(error = %e, "retry sweep failed"),
            }
        }
    }

    pub async fn sweep_once(&self) -> report_flow::Result<usize> {
        let batch = self
            .store
            .take_retry_batch(self.stale_after, self.batch)
            .await?;
        let mut requeued = 0;
        for session_id in batch {
            match self.queue.enqueue(session_id.clone()).await {
                Ok(()) => requeued += 1,
                Err(e) => {
                    error!(%session_id, error = %e, "failed to re-queue session");
                    let flag = SessionPatch {
                        needs_attention: Some(true),
                        ..Default::default()
                    };
                    let _ = self.store.update(&session_id, flag).await;
                }
            }
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use report_flow::{InMemorySessionStore, PaymentStatus, ReportStatus, SessionRecord};

    use super::*;

    #[tokio::test]
    async fn sweep_requeues_flagged_sessions() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut record = SessionRecord::new("s1");
        record.payment_status = PaymentStatus::Succeeded;
        record.needs_attention = true;
        store.create(record).await.unwrap();

        let (queue, mut rx) = GenerationQueue::new(8);
        let sweep = RetrySweep::new(
            store.clone(),
            queue,
            Duration::from_secs(300),
            Duration::from_secs(600),
            10,
        );

        assert_eq!(sweep.sweep_once().await.unwrap(), 1);
        assert_eq!(rx.recv().await.as_deref(), Some("s1"));

        let record = store.get("s1").await.unwrap().unwrap();
        assert_eq!(record.report_status, ReportStatus::Queued);
    }

    #[tokio::test]
    async fn sweep_with_clean_backlog_does_nothing() {
        let store = Arc::new(InMemorySessionStore::new());
        store.create(SessionRecord::new("s1")).await.unwrap();

        let (queue, mut rx) = GenerationQueue::new(8);
        let sweep = RetrySweep::new(
            store,
            queue,
            Duration::from_secs(300),
            Duration::from_secs(600),
            10,
        );

        assert_eq!(sweep.sweep_once().await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }
}
