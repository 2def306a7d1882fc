use tokio::sync::mpsc;

use crate::error::{FlowError, Result};

/// Explicit work queue for generation jobs. The webhook handler, the manual
/// trigger endpoint and the retry sweep all enqueue session ids; a single
/// worker loop owns the receiver and drives the orchestrator, so triggering
/// requests and generation have independent lifecycles.
#[derive(Clone)]
pub struct GenerationQueue {
    tx: mpsc::Sender<String>,
}

impl GenerationQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn enqueue(&self, session_id: impl Into<String>) -> Result<()> {
        self.tx
            .send(session_id.into())
            .await
            .map_err(|_| FlowError::QueueClosed)
    }
}
