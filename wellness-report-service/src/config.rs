use std::time::Duration;

use anyhow::{Context, Result};

/// Process configuration, read once at start-up and handed to components
/// explicitly. No global state.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub generation_model: String,
    pub generation_timeout: Duration,
    pub webhook_secret: String,
    pub webhook_tolerance: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub sweep_interval: Duration,
    pub sweep_batch: usize,
    pub sweep_stale_after: Duration,
    pub queue_capacity: usize,
    pub face_api: Option<FaceApiConfig>,
}

/// Credentials for the external face-attribute analysis service. The
/// analysis endpoint is disabled when these are absent.
#[derive(Debug, Clone)]
pub struct FaceApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_secret: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn secs_or(name: &str, default: u64) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => {
            let secs = raw
                .parse::<u64>()
                .with_context(|| format!("{name} must be a number of seconds, got {raw:?}"))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn number_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let face_api = match (
            std::env::var("FACE_API_ENDPOINT"),
            std::env::var("FACE_API_KEY"),
            std::env::var("FACE_API_SECRET"),
        ) {
            (Ok(endpoint), Ok(api_key), Ok(api_secret)) => Some(FaceApiConfig {
                endpoint,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            database_url: std::env::var("DATABASE_URL").ok(),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            generation_model: var_or("GENERATION_MODEL", "google/gemini-flash-1.5"),
            generation_timeout: secs_or("GENERATION_TIMEOUT_SECS", 12)?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .context("WEBHOOK_SECRET environment variable not set")?,
            webhook_tolerance: secs_or("WEBHOOK_TOLERANCE_SECS", 300)?,
            rate_limit_window: secs_or("RATE_LIMIT_WINDOW_SECS", 60)?,
            rate_limit_max: number_or("RATE_LIMIT_MAX_REQUESTS", 30)?,
            sweep_interval: secs_or("SWEEP_INTERVAL_SECS", 300)?,
            sweep_batch: number_or("SWEEP_BATCH_SIZE", 10)?,
            sweep_stale_after: secs_or("SWEEP_STALE_AFTER_SECS", 600)?,
            queue_capacity: number_or("QUEUE_CAPACITY", 256)?,
            face_api,
        })
    }
}
