use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;

use crate::{
    error::{FlowError, Result},
    session::{PaymentStatus, ReportStatus, SessionPatch, SessionRecord, now_rfc3339},
};

/// Document-store access to session records. One record per key; every
/// method is atomic with respect to a single record.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, record: SessionRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Field-level merge of `patch` into the stored record.
    async fn update(&self, id: &str, patch: SessionPatch) -> Result<()>;

    /// Compare-and-swap `report_status` from `unset | queued | error` to
    /// `processing`. Returns `true` for exactly one of any set of
    /// concurrent callers; `false` when the session is missing, already
    /// complete, or already being processed.
    async fn try_claim_generation(&self, id: &str) -> Result<bool>;

    /// The retry sweep's backlog: paid sessions that never reached
    /// `complete` and are flagged, errored, or stuck in `queued` /
    /// `processing` past `stale_after`. Stuck sessions are reset to
    /// `queued` as they are taken.
    async fn take_retry_batch(&self, stale_after: Duration, limit: usize) -> Result<Vec<String>>;
}

pub(crate) fn staleness_cutoff(stale_after: Duration) -> String {
    let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::zero());
    (Utc::now() - stale_after).to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn retry_candidate(record: &SessionRecord, cutoff: &str) -> bool {
    if record.payment_status != PaymentStatus::Succeeded
        || record.report_status == ReportStatus::Complete
    {
        return false;
    }
    record.needs_attention
        || record.report_status == ReportStatus::Error
        || (matches!(
            record.report_status,
            ReportStatus::Queued | ReportStatus::Processing
        ) && record.updated_at.as_str() < cutoff)
}

/// In-memory implementation of SessionStore, used for development and tests.
pub struct InMemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, record: SessionRecord) -> Result<()> {
        self.sessions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> Result<()> {
        match self.sessions.get_mut(id) {
            Some(mut entry) => {
                patch.apply(&mut entry);
                Ok(())
            }
            None => Err(FlowError::SessionNotFound(id.to_string())),
        }
    }

    async fn try_claim_generation(&self, id: &str) -> Result<bool> {
        let Some(mut entry) = self.sessions.get_mut(id) else {
            return Ok(false);
        };
        match entry.report_status {
            ReportStatus::Unset | ReportStatus::Queued | ReportStatus::Error => {
                entry.report_status = ReportStatus::Processing;
                entry.updated_at = now_rfc3339();
                Ok(true)
            }
            ReportStatus::Processing | ReportStatus::Complete => Ok(false),
        }
    }

    async fn take_retry_batch(&self, stale_after: Duration, limit: usize) -> Result<Vec<String>> {
        let cutoff = staleness_cutoff(stale_after);
        let candidates: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| retry_candidate(entry.value(), &cutoff))
            .map(|entry| entry.key().clone())
            .take(limit)
            .collect();

        let mut taken = Vec::with_capacity(candidates.len());
        for id in candidates {
            // Re-check under the entry lock; another sweep may have raced us.
            if let Some(mut entry) = self.sessions.get_mut(&id) {
                if retry_candidate(&entry, &cutoff) {
                    entry.report_status = ReportStatus::Queued;
                    entry.updated_at = now_rfc3339();
                    taken.push(id);
                }
            }
        }
        Ok(taken)
    }
}
