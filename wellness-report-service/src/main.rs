use std::sync::Arc;

use report_flow::{GenerationQueue, InMemorySessionStore, PostgresSessionStore, SessionStore};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wellness_report_service::{
    api::{AppState, build_router},
    config::Config,
    face::{FaceAnalyzer, FaceApiClient},
    orchestrator::ReportOrchestrator,
    payment::{PaymentEventHandler, WebhookVerifier},
    rate_limit::RateLimiter,
    report::{DisabledGenerator, OpenRouterGenerator, ReportGenerator},
    sweep::RetrySweep,
};

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "wellness_report_service=debug,report_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            // Human-readable logging for development
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            // Structured JSON logging for production
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // Check for DATABASE_URL and use PostgreSQL if available, otherwise use in-memory
    let session_store: Arc<dyn SessionStore> = if let Some(database_url) = &config.database_url {
        match PostgresSessionStore::connect(database_url).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!(
                    "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                    e
                );
                Arc::new(InMemorySessionStore::new())
            }
        }
    } else {
        info!("Using in-memory session store (set DATABASE_URL to use PostgreSQL)");
        Arc::new(InMemorySessionStore::new())
    };

    let generator: Arc<dyn ReportGenerator> = match &config.openrouter_api_key {
        Some(api_key) => Arc::new(OpenRouterGenerator::new(
            api_key.clone(),
            config.generation_model.clone(),
        )),
        None => {
            warn!("OPENROUTER_API_KEY not set, every report will use the deterministic fallback");
            Arc::new(DisabledGenerator)
        }
    };

    let (queue, mut jobs) = GenerationQueue::new(config.queue_capacity);
    let orchestrator = Arc::new(ReportOrchestrator::new(
        session_store.clone(),
        generator,
        config.generation_timeout,
    ));

    // Generation worker: the single consumer of the work queue.
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            while let Some(session_id) = jobs.recv().await {
                match orchestrator.generate(&session_id).await {
                    Ok(outcome) => {
                        info!(%session_id, outcome = outcome.label(), "generation finished")
                    }
                    Err(e) => error!(%session_id, error = %e, "generation failed"),
                }
            }
        });
    }

    let sweep = RetrySweep::new(
        session_store.clone(),
        queue.clone(),
        config.sweep_interval,
        config.sweep_stale_after,
        config.sweep_batch,
    );
    tokio::spawn(sweep.run());

    let face: Option<Arc<dyn FaceAnalyzer>> = config
        .face_api
        .clone()
        .map(|face_config| Arc::new(FaceApiClient::new(face_config)) as Arc<dyn FaceAnalyzer>);

    let state = AppState {
        payments: Arc::new(PaymentEventHandler::new(
            session_store.clone(),
            queue.clone(),
        )),
        verifier: Arc::new(WebhookVerifier::new(
            config.webhook_secret.clone(),
            config.webhook_tolerance,
        )),
        limiter: Arc::new(RateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max,
        )),
        store: session_store,
        queue,
        face,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();

    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.unwrap();
}
