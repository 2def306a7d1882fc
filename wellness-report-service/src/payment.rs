//! Payment gateway webhook handling.
//!
//! The gateway delivers signed events at least once, possibly out of order.
//! Everything here is written to be safe under duplicate delivery: payment
//! fields converge to the same values and the queued-trigger guard ensures a
//! success event enqueues at most one generation job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use report_flow::{
    GenerationQueue, PaymentStatus, ReportStatus, SessionPatch, SessionRecord, SessionStore,
};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{error, info, warn};

pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("missing or malformed signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance")]
    Stale,

    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies the gateway's `t=<unix>,v1=<hex>` signature scheme: an
/// HMAC-SHA256 of `"{t}.{body}"` under the shared secret, with a bounded
/// timestamp skew to blunt replay.
pub struct WebhookVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => signature = hex::decode(value).ok(),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
        let signature = signature.ok_or(SignatureError::Malformed)?;

        if (now - timestamp).unsigned_abs() > self.tolerance.as_secs() {
            return Err(SignatureError::Stale);
        }

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&signature)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Produce a valid header for `payload` at `timestamp`. Used by tests
    /// and local gateway simulation.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        format!(
            "t={timestamp},v1={}",
            hex::encode(mac.finalize().into_bytes())
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentEventType {
    #[serde(rename = "payment.succeeded")]
    Succeeded,
    #[serde(rename = "payment.failed")]
    Failed,
    #[serde(rename = "payment.canceled")]
    Canceled,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// A signed event object from the payment gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: PaymentEventType,
    /// Amount in minor units (cents).
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

/// What the gateway is told about an accepted event.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookAck {
    Processed,
    Ignored(&'static str),
}

pub struct PaymentEventHandler {
    store: Arc<dyn SessionStore>,
    queue: GenerationQueue,
}

impl PaymentEventHandler {
    pub fn new(store: Arc<dyn SessionStore>, queue: GenerationQueue) -> Self {
        Self { store, queue }
    }

    /// Apply one gateway event. Safe to call any number of times with the
    /// same event. Returns once the session update is durable; a failed
    /// downstream enqueue is flagged for the retry sweep rather than
    /// surfaced to the gateway.
    pub async fn handle(&self, event: PaymentEvent) -> report_flow::Result<WebhookAck> {
        let Some(session_id) = event.metadata.session_id.clone() else {
            warn!(event_id = %event.id, "payment event without a session id, ignoring");
            return Ok(WebhookAck::Ignored("no session id in event metadata"));
        };

        let Some(session) = self.store.get(&session_id).await? else {
            warn!(%session_id, event_id = %event.id, "payment event for unknown session");
            return Ok(WebhookAck::Ignored("unknown session"));
        };

        match event.event_type {
            PaymentEventType::Succeeded => self.apply_success(session, event).await,
            PaymentEventType::Failed => {
                self.apply_terminal(session, PaymentStatus::Failed).await
            }
            PaymentEventType::Canceled => {
                self.apply_terminal(session, PaymentStatus::Canceled).await
            }
            PaymentEventType::Other => Ok(WebhookAck::Ignored("unhandled event type")),
        }
    }

    async fn apply_success(
        &self,
        session: SessionRecord,
        event: PaymentEvent,
    ) -> report_flow::Result<WebhookAck> {
        let session_id = session.id.clone();
        info!(%session_id, event_id = %event.id, amount = ?event.amount, "payment succeeded");

        let patch = SessionPatch {
            payment_status: Some(PaymentStatus::Succeeded),
            payment_amount: event.amount.map(|cents| format!("{:.2}", cents as f64 / 100.0)),
            payment_method: event.payment_method.clone(),
            payment_ref: Some(event.id.clone()),
            ..Default::default()
        }
        .with_event("payment_succeeded");
        self.store.update(&session_id, patch).await?;

        // Duplicate-delivery guard: only the first success event finds the
        // report still untriggered.
        if matches!(
            session.report_status,
            ReportStatus::Queued | ReportStatus::Processing | ReportStatus::Complete
        ) {
            info!(%session_id, "generation already triggered, not re-queueing");
            return Ok(WebhookAck::Processed);
        }

        let queue_patch = SessionPatch {
            report_status: Some(ReportStatus::Queued),
            ..Default::default()
        }
        .with_event("generation_queued");
        self.store.update(&session_id, queue_patch).await?;

        if let Err(enqueue_error) = self.queue.enqueue(session_id.clone()).await {
            error!(%session_id, error = %enqueue_error, "failed to enqueue generation");
            let flag = SessionPatch {
                needs_attention: Some(true),
                report_error: Some(format!("failed to enqueue generation: {enqueue_error}")),
                ..Default::default()
            };
            // The sweep picks this session up; the gateway still gets success.
            let _ = self.store.update(&session_id, flag).await;
        }
        Ok(WebhookAck::Processed)
    }

    async fn apply_terminal(
        &self,
        session: SessionRecord,
        status: PaymentStatus,
    ) -> report_flow::Result<WebhookAck> {
        // Out-of-order delivery must not regress a completed payment.
        if session.payment_status == PaymentStatus::Succeeded {
            return Ok(WebhookAck::Ignored("payment already succeeded"));
        }
        let patch = SessionPatch {
            payment_status: Some(status),
            ..Default::default()
        };
        self.store.update(&session.id, patch).await?;
        Ok(WebhookAck::Processed)
    }
}
