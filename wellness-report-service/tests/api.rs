//! End-to-end router tests: quiz flow, webhook-gated generation, polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use report_flow::{GenerationQueue, InMemorySessionStore};
use serde_json::{Value, json};
use tower::ServiceExt;
use wellness_report_service::api::{AppState, build_router};
use wellness_report_service::orchestrator::ReportOrchestrator;
use wellness_report_service::payment::{PaymentEventHandler, SIGNATURE_HEADER, WebhookVerifier};
use wellness_report_service::rate_limit::RateLimiter;
use wellness_report_service::report::ReportGenerator;

const SECRET: &str = "whsec_test";

const MODEL_REPORT: &str = r#"```json
{
    "user_name": "Jessica",
    "wellness_age": 36,
    "metrics": { "wellness_score": { "value": 74 } },
    "plan": [{ "day": 1, "theme": "Hydration", "icon": "💧",
               "morning": "Drink a glass of water", "nutrition": "Add greens",
               "activity": "Walk 15 minutes", "evening": "No screens late" }]
}
```"#;

struct CountingGenerator {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ReportGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(MODEL_REPORT.to_string())
    }
}

fn test_app(max_requests: u32) -> (Router, Arc<CountingGenerator>, WebhookVerifier) {
    let store = Arc::new(InMemorySessionStore::new());
    let (queue, mut jobs) = GenerationQueue::new(16);
    let generator = Arc::new(CountingGenerator {
        calls: AtomicUsize::new(0),
    });

    let orchestrator = Arc::new(ReportOrchestrator::new(
        store.clone(),
        generator.clone(),
        Duration::from_secs(5),
    ));
    tokio::spawn(async move {
        while let Some(session_id) = jobs.recv().await {
            let _ = orchestrator.generate(&session_id).await;
        }
    });

    let state = AppState {
        payments: Arc::new(PaymentEventHandler::new(store.clone(), queue.clone())),
        verifier: Arc::new(WebhookVerifier::new(SECRET, Duration::from_secs(300))),
        limiter: Arc::new(RateLimiter::new(Duration::from_secs(60), max_requests)),
        store,
        queue,
        face: None,
    };

    (
        build_router(state),
        generator,
        WebhookVerifier::new(SECRET, Duration::from_secs(300)),
    )
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn start_session(app: &Router) -> String {
    let (status, body) = post_json(app, "/session/start", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["session_id"].as_str().unwrap().to_string()
}

async fn deliver_webhook(app: &Router, signer: &WebhookVerifier, session_id: &str) -> (StatusCode, Value) {
    let payload = json!({
        "id": "evt_success_1",
        "type": "payment.succeeded",
        "amount": 1399,
        "currency": "usd",
        "payment_method": "card",
        "metadata": { "session_id": session_id }
    })
    .to_string();
    let signature = signer.sign(payload.as_bytes(), chrono::Utc::now().timestamp());

    let request = Request::builder()
        .method("POST")
        .uri("/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(payload))
        .unwrap();
    send(app, request).await
}

async fn poll_until_complete(app: &Router, session_id: &str) -> Value {
    for _ in 0..100 {
        let (status, body) =
            post_json(app, "/session/report/status", json!({ "session_id": session_id })).await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("complete") => return body["data"].clone(),
            Some("queued") | Some("processing") | Some("pending") => {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            other => panic!("unexpected poll status: {other:?} ({body})"),
        }
    }
    panic!("report never completed");
}

#[tokio::test]
async fn quiz_to_report_happy_path() {
    let (app, generator, signer) = test_app(30);
    let session_id = start_session(&app).await;

    for (question_id, answer) in [
        ("name", json!("Jessica")),
        ("age", json!("34")),
        ("sleep", json!("7-8 hours")),
        ("activity", json!("3-4 times")),
        ("stress", json!(4)),
        ("height", json!(175)),
        ("weight", json!(70)),
    ] {
        let (status, body) = post_json(
            &app,
            "/session/answer",
            json!({ "session_id": session_id, "question_id": question_id, "answer": answer }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, _) = post_json(
        &app,
        "/session/plan",
        json!({ "session_id": session_id, "plan": "advanced" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Before payment, polling reports pending and triggering is rejected.
    let (_, body) =
        post_json(&app, "/session/report/status", json!({ "session_id": session_id })).await;
    assert_eq!(body["status"], "pending");
    let (status, _) =
        post_json(&app, "/session/report", json!({ "session_id": session_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = deliver_webhook(&app, &signer, &session_id).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let report = poll_until_complete(&app, &session_id).await;
    assert_eq!(report["user_name"], "Jessica");
    assert_eq!(
        report["metrics"]["wellness_score"]["value"].as_f64(),
        Some(74.0)
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    // Re-triggering after completion returns the stored report untouched.
    let (status, body) =
        post_json(&app, "/session/report", json!({ "session_id": session_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complete");
    assert_eq!(
        body["data"]["metrics"]["wellness_score"]["value"].as_f64(),
        Some(74.0)
    );
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn duplicate_webhooks_generate_once() {
    let (app, generator, signer) = test_app(30);
    let session_id = start_session(&app).await;

    let (status, _) = deliver_webhook(&app, &signer, &session_id).await;
    assert_eq!(status, StatusCode::OK);
    poll_until_complete(&app, &session_id).await;

    let (status, _) = deliver_webhook(&app, &signer, &session_id).await;
    assert_eq!(status, StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsigned_webhook_is_rejected() {
    let (app, _generator, _signer) = test_app(30);
    let session_id = start_session(&app).await;

    let payload = json!({
        "id": "evt_1",
        "type": "payment.succeeded",
        "metadata": { "session_id": session_id }
    })
    .to_string();

    // Missing signature header
    let request = Request::builder()
        .method("POST")
        .uri("/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signature under the wrong secret
    let wrong = WebhookVerifier::new("other_secret", Duration::from_secs(300));
    let request = Request::builder()
        .method("POST")
        .uri("/payment/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            SIGNATURE_HEADER,
            wrong.sign(payload.as_bytes(), chrono::Utc::now().timestamp()),
        )
        .body(Body::from(payload))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rate_limiter_guards_session_creation() {
    let (app, _generator, _signer) = test_app(2);

    for _ in 0..2 {
        let (status, _) = post_json(&app, "/session/start", json!({})).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = post_json(&app, "/session/start", json!({})).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn invalid_answer_is_rejected() {
    let (app, _generator, _signer) = test_app(30);
    let session_id = start_session(&app).await;

    let (status, body) = post_json(
        &app,
        "/session/answer",
        json!({ "session_id": session_id, "question_id": "sleep", "answer": "a lot" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("sleep"));
}

#[tokio::test]
async fn unknown_session_returns_not_found() {
    let (app, _generator, _signer) = test_app(30);
    let (status, _) = post_json(
        &app,
        "/session/report/status",
        json!({ "session_id": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
