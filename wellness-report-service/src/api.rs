//! HTTP surface.
//!
//! Every endpoint answers with the `{status, data | message}` envelope the
//! quiz client polls against. Mutating client operations pass the rate
//! limiter; report triggering and the gateway webhook are server-to-server
//! and exempt.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use report_flow::{
    ClientErrorRecord, FlowError, GenerationQueue, PaymentStatus, PlanType, ReportStatus,
    SessionPatch, SessionRecord, SessionStore, now_rfc3339,
};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::face::{FaceAnalysisError, FaceAnalyzer};
use crate::payment::{PaymentEvent, PaymentEventHandler, SIGNATURE_HEADER, WebhookAck, WebhookVerifier};
use crate::rate_limit::RateLimiter;
use crate::scoring;

/// Uniform response envelope.
#[derive(Debug, serde::Serialize)]
pub struct Envelope {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    fn ok(data: Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            message: None,
        }
    }

    fn status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            data: None,
            message: None,
        }
    }

    fn status_with_data(status: &str, data: Value) -> Self {
        Self {
            status: status.to_string(),
            data: Some(data),
            message: None,
        }
    }

    fn message(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("invalid webhook signature")]
    SignatureInvalid,

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Store(FlowError),
}

impl From<FlowError> for ApiError {
    fn from(error: FlowError) -> Self {
        match error {
            FlowError::SessionNotFound(id) => ApiError::NotFound(id),
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, format!("session not found: {id}")),
            ApiError::SignatureInvalid => (
                StatusCode::UNAUTHORIZED,
                "invalid webhook signature".to_string(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "rate limit exceeded, retry in {} seconds",
                    retry_after.as_secs().max(1)
                ),
            ),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message.clone()),
            ApiError::Store(e) => {
                error!(error = %e, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage failure".to_string(),
                )
            }
        };

        let mut response =
            (status, Json(Envelope::message("error", message))).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

type ApiResult = Result<Json<Envelope>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub queue: GenerationQueue,
    pub payments: Arc<PaymentEventHandler>,
    pub verifier: Arc<WebhookVerifier>,
    pub limiter: Arc<RateLimiter>,
    pub face: Option<Arc<dyn FaceAnalyzer>>,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    session_id: String,
    question_id: String,
    answer: Value,
}

#[derive(Debug, Deserialize)]
struct PlanRequest {
    session_id: String,
    plan: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    session_id: String,
    photo_data_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ClientErrorRequest {
    session_id: String,
    message: String,
    #[serde(default)]
    context: Option<Value>,
}

/// Client identity for rate limiting: the forwarded address when running
/// behind a proxy, else a shared bucket.
fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(|value| value.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn check_rate(state: &AppState, headers: &HeaderMap, action: &str) -> Result<(), ApiError> {
    let identity = client_identity(headers);
    let decision = state.limiter.check(&identity, action);
    if !decision.allowed {
        warn!(%identity, action, "rate limit exceeded");
        return Err(ApiError::RateLimited {
            retry_after: decision.retry_after.unwrap_or(Duration::from_secs(1)),
        });
    }
    Ok(())
}

async fn load_session(state: &AppState, session_id: &str) -> Result<SessionRecord, ApiError> {
    state
        .store
        .get(session_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(session_id.to_string()))
}

async fn health() -> Json<Envelope> {
    Json(Envelope::ok(json!({
        "healthy": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn start_session(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    check_rate(&state, &headers, "session_start")?;

    let session_id = Uuid::new_v4().to_string();
    state
        .store
        .create(SessionRecord::new(session_id.clone()))
        .await?;
    info!(%session_id, "session created");
    Ok(Json(Envelope::ok(json!({ "session_id": session_id }))))
}

async fn save_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnswerRequest>,
) -> ApiResult {
    check_rate(&state, &headers, "answer")?;

    if request.question_id.trim().is_empty() {
        return Err(ApiError::Validation("question_id is required".to_string()));
    }
    scoring::validate_answer(&request.question_id, &request.answer)
        .map_err(ApiError::Validation)?;

    let mut answers = serde_json::Map::new();
    answers.insert(request.question_id.clone(), request.answer);
    state
        .store
        .update(
            &request.session_id,
            SessionPatch {
                answers: Some(answers),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(Envelope::message("ok", "answer saved")))
}

async fn select_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlanRequest>,
) -> ApiResult {
    check_rate(&state, &headers, "plan")?;

    let plan = PlanType::parse(&request.plan)
        .ok_or_else(|| ApiError::Validation(format!("invalid plan selected: {}", request.plan)))?;

    let session = load_session(&state, &request.session_id).await?;
    if session.payment_status == PaymentStatus::Succeeded {
        return Err(ApiError::Validation(
            "plan can no longer be changed after payment".to_string(),
        ));
    }

    state
        .store
        .update(
            &request.session_id,
            SessionPatch {
                plan_type: Some(plan),
                ..Default::default()
            },
        )
        .await?;
    info!(session_id = %request.session_id, plan = plan.as_str(), "plan selected");
    Ok(Json(Envelope::ok(json!({ "plan": plan.as_str() }))))
}

async fn upload_analysis(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AnalysisRequest>,
) -> ApiResult {
    check_rate(&state, &headers, "analysis")?;

    let analyzer = state
        .face
        .clone()
        .ok_or_else(|| ApiError::Validation("face analysis is not configured".to_string()))?;

    let session = load_session(&state, &request.session_id).await?;
    if session.photo_analysis.is_some() {
        return Err(ApiError::Validation(
            "photo analysis already recorded for this session".to_string(),
        ));
    }

    let encoded = request
        .photo_data_url
        .split(";base64,")
        .last()
        .unwrap_or_default();
    let image = BASE64
        .decode(encoded.trim())
        .map_err(|_| ApiError::Validation("invalid photo data".to_string()))?;

    let analysis = analyzer.analyze(&image).await.map_err(|e| match e {
        FaceAnalysisError::NoFaceDetected => ApiError::Validation("no face detected".to_string()),
        FaceAnalysisError::Upstream(message) => ApiError::Upstream(message),
    })?;

    let data = serde_json::to_value(&analysis).map_err(FlowError::from)?;
    state
        .store
        .update(
            &request.session_id,
            SessionPatch {
                photo_analysis: Some(analysis),
                ..Default::default()
            }
            .with_event("photo_analyzed"),
        )
        .await?;
    Ok(Json(Envelope::ok(data)))
}

/// Manual generation trigger. Idempotent per session: finished sessions
/// short-circuit with the stored report and queued/processing sessions are
/// left alone.
async fn trigger_report(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResult {
    let session = load_session(&state, &request.session_id).await?;

    if session.report_status == ReportStatus::Complete {
        if let Some(data) = session.report_data {
            return Ok(Json(Envelope::status_with_data("complete", data)));
        }
    }
    if session.payment_status != PaymentStatus::Succeeded {
        return Err(ApiError::Validation(
            "payment has not completed for this session".to_string(),
        ));
    }

    match session.report_status {
        // Complete with data returned above; a complete session without
        // data is a broken record and must not re-enter the pipeline.
        ReportStatus::Complete => Ok(Json(Envelope::message("error", "report data missing"))),
        ReportStatus::Queued => Ok(Json(Envelope::status("queued"))),
        ReportStatus::Processing => Ok(Json(Envelope::status("processing"))),
        ReportStatus::Unset | ReportStatus::Error => {
            state
                .store
                .update(
                    &request.session_id,
                    SessionPatch {
                        report_status: Some(ReportStatus::Queued),
                        ..Default::default()
                    }
                    .with_event("generation_queued"),
                )
                .await?;
            if let Err(e) = state.queue.enqueue(request.session_id.clone()).await {
                error!(session_id = %request.session_id, error = %e, "failed to enqueue generation");
                let flag = SessionPatch {
                    needs_attention: Some(true),
                    ..Default::default()
                };
                let _ = state.store.update(&request.session_id, flag).await;
            }
            Ok(Json(Envelope::status("queued")))
        }
    }
}

async fn report_status(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResult {
    let session = load_session(&state, &request.session_id).await?;

    let envelope = match session.report_status {
        ReportStatus::Complete => match session.report_data {
            Some(data) => Envelope::status_with_data("complete", data),
            None => Envelope::message("error", "report data missing"),
        },
        ReportStatus::Error => Envelope::message(
            "error",
            session
                .report_error
                .unwrap_or_else(|| "report generation failed".to_string()),
        ),
        ReportStatus::Queued => Envelope::status("queued"),
        ReportStatus::Processing => Envelope::status("processing"),
        ReportStatus::Unset => Envelope::status("pending"),
    };
    Ok(Json(envelope))
}

async fn log_client_error(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ClientErrorRequest>,
) -> ApiResult {
    check_rate(&state, &headers, "error_log")?;

    if request.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }

    state
        .store
        .update(
            &request.session_id,
            SessionPatch {
                errors: Some(vec![ClientErrorRecord {
                    at: now_rfc3339(),
                    message: request.message,
                    context: request.context,
                }]),
                ..Default::default()
            },
        )
        .await?;
    Ok(Json(Envelope::message("ok", "error recorded")))
}

async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::SignatureInvalid)?;
    state.verifier.verify(&body, signature).map_err(|e| {
        warn!(error = %e, "webhook signature rejected");
        ApiError::SignatureInvalid
    })?;

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("malformed event payload: {e}")))?;

    let ack = state.payments.handle(event).await?;
    let message = match ack {
        WebhookAck::Processed => "received",
        WebhookAck::Ignored(reason) => reason,
    };
    Ok(Json(Envelope {
        status: "ok".to_string(),
        data: Some(json!({ "received": true })),
        message: Some(message.to_string()),
    }))
}

/// Tag every request with a correlation id and wrap it in a tracing span.
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }
    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/session/start", post(start_session))
        .route("/session/answer", post(save_answer))
        .route("/session/plan", post(select_plan))
        .route("/session/analysis", post(upload_analysis))
        .route("/session/report", post(trigger_report))
        .route("/session/report/status", post(report_status))
        .route("/session/error", post(log_client_error))
        .route("/payment/webhook", post(payment_webhook))
        .layer(from_fn(correlation_id_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_identity_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_identity(&headers), "203.0.113.7");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_identity(&headers), "198.51.100.2");

        assert_eq!(client_identity(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let rendered = serde_json::to_string(&Envelope::status("pending")).unwrap();
        assert_eq!(rendered, r#"{"status":"pending"}"#);

        let rendered = serde_json::to_string(&Envelope::message("error", "nope")).unwrap();
        assert_eq!(rendered, r#"{"status":"error","message":"nope"}"#);
    }
}
