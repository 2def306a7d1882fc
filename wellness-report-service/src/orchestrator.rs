//! The generate-or-fallback state machine.

use std::sync::Arc;
use std::time::Duration;

use report_flow::{FlowError, ReportStatus, SessionPatch, SessionRecord, SessionStore};
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::report::{
    FallbackReportBuilder, GenerationError, ReportGenerator, build_generation_prompt,
    generator::parse_report,
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Store(#[from] FlowError),
}

/// How a `generate` call concluded.
#[derive(Debug)]
pub enum ReportOutcome {
    /// The model produced a schema-valid report.
    Generated(Value),
    /// The model attempt failed; the deterministic builder stepped in.
    Fallback { report: Value, reason: String },
    /// The session already had a report; nothing was regenerated.
    Existing(Value),
    /// Another attempt holds the claim; this call did no work.
    InFlight,
}

impl ReportOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generated(_) => "generated",
            Self::Fallback { .. } => "fallback",
            Self::Existing(_) => "existing",
            Self::InFlight => "in_flight",
        }
    }
}

/// Drives a session from a generation trigger to a terminal report status.
///
/// Every failure on the model path resolves into a fallback report; a paying
/// user only ends in `error` if the store itself refuses the final write.
pub struct ReportOrchestrator {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn ReportGenerator>,
    generation_timeout: Duration,
}

impl ReportOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn ReportGenerator>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            generator,
            generation_timeout,
        }
    }

    pub async fn generate(&self, session_id: &str) -> Result<ReportOutcome, OrchestratorError> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        // Idempotent short-circuit: a finished session is never regenerated.
        if session.report_status == ReportStatus::Complete {
            if let Some(data) = session.report_data.clone() {
                info!(session_id, "report already complete, returning stored data");
                return Ok(ReportOutcome::Existing(data));
            }
        }

        // Single-winner claim: unset/queued/error -> processing.
        if !self.store.try_claim_generation(session_id).await? {
            let current = self
                .store
                .get(session_id)
                .await?
                .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;
            if current.report_status == ReportStatus::Complete {
                if let Some(data) = current.report_data {
                    return Ok(ReportOutcome::Existing(data));
                }
            }
            info!(session_id, "generation already in flight");
            return Ok(ReportOutcome::InFlight);
        }

        self.store
            .update(
                session_id,
                SessionPatch::default().with_event("generation_started"),
            )
            .await?;

        match self.attempt_model_report(&session).await {
            Ok(report) => {
                info!(session_id, "model report generated");
                self.persist_report(session_id, report.clone(), None).await?;
                Ok(ReportOutcome::Generated(report))
            }
            Err(reason) => {
                warn!(session_id, reason = %reason, "model attempt failed, using fallback");
                let fallback = FallbackReportBuilder::build(&session);
                let report = serde_json::to_value(&fallback).map_err(FlowError::from)?;
                self.persist_report(session_id, report.clone(), Some(reason.to_string()))
                    .await?;
                Ok(ReportOutcome::Fallback {
                    report,
                    reason: reason.to_string(),
                })
            }
        }
    }

    /// One bounded model attempt. A timed-out future is dropped here, so a
    /// late response can never touch the session.
    async fn attempt_model_report(
        &self,
        session: &SessionRecord,
    ) -> Result<Value, GenerationError> {
        let prompt = build_generation_prompt(session);
        let raw = match timeout(self.generation_timeout, self.generator.generate(&prompt)).await {
            Err(_) => return Err(GenerationError::Timeout(self.generation_timeout)),
            Ok(Err(e)) => return Err(GenerationError::Upstream(e.to_string())),
            Ok(Ok(raw)) => raw,
        };
        let report = parse_report(&raw)?;
        serde_json::to_value(&report).map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    async fn persist_report(
        &self,
        session_id: &str,
        report: Value,
        failure_reason: Option<String>,
    ) -> Result<(), OrchestratorError> {
        let patch = SessionPatch {
            report_data: Some(report),
            report_status: Some(ReportStatus::Complete),
            report_error: failure_reason,
            needs_attention: Some(false),
            ..Default::default()
        }
        .with_event("report_completed");

        if let Err(persist_error) = self.store.update(session_id, patch).await {
            error!(session_id, error = %persist_error, "failed to persist report");
            let mark_error = SessionPatch {
                report_status: Some(ReportStatus::Error),
                report_error: Some(format!("failed to persist report: {persist_error}")),
                ..Default::default()
            };
            // Best effort; the retry sweep will find the session either way.
            let _ = self.store.update(session_id, mark_error).await;
            return Err(persist_error.into());
        }
        Ok(())
    }
}
