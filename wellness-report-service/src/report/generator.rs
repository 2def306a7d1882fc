//! The generative-text collaborator seam.

use std::time::Duration;

use async_trait::async_trait;
use rig::completion::Chat;
use rig::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::schema::{ReportData, SchemaViolation};

/// Why a model attempt did not produce a usable report. Every variant is
/// recovered locally by the fallback builder; none of them reach the user
/// as a hard failure.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model call failed: {0}")]
    Upstream(String),

    #[error("malformed model output: {0}")]
    Malformed(String),

    #[error(transparent)]
    SchemaInvalid(#[from] SchemaViolation),
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Return the model's raw text for the given prompt.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Production generator backed by an OpenRouter-served model.
pub struct OpenRouterGenerator {
    api_key: String,
    model: String,
}

impl OpenRouterGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ReportGenerator for OpenRouterGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let client = rig::providers::openrouter::Client::new(&self.api_key);
        let agent = client.agent(&self.model).build();
        let answer = agent
            .chat(prompt, vec![])
            .await
            .map_err(|e| anyhow::anyhow!("LLM chat failed: {e}"))?;
        debug!(length = answer.len(), "model response received");
        Ok(answer)
    }
}

/// Stand-in used when no model credentials are configured; every attempt
/// routes to the fallback builder.
pub struct DisabledGenerator;

#[async_trait]
impl ReportGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("no generative model configured"))
    }
}

/// Strip formatting wrappers from raw model output and parse the single
/// JSON object it is expected to contain.
pub fn parse_report(raw: &str) -> Result<ReportData, GenerationError> {
    if raw.trim().is_empty() {
        return Err(GenerationError::Malformed(
            "empty model output".to_string(),
        ));
    }

    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => {
            return Err(GenerationError::Malformed(
                "no JSON object in model output".to_string(),
            ));
        }
    };

    let report: ReportData = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("could not parse report JSON: {e}")))?;
    report.validate()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BODY: &str = r#"{
        "wellness_age": 38,
        "metrics": { "wellness_score": { "value": 72 } },
        "plan": [{ "day": 1, "theme": "Hydration", "icon": "💧" }]
    }"#;

    #[test]
    fn parses_fenced_output() {
        let raw = format!("```json\n{VALID_BODY}\n```");
        let report = parse_report(&raw).unwrap();
        assert_eq!(report.wellness_age, 38);
    }

    #[test]
    fn parses_output_with_surrounding_prose() {
        let raw = format!("Here is your report:\n{VALID_BODY}\nLet me know if you need more.");
        // The trailing prose contains no braces, so the object is recovered.
        assert!(parse_report(&raw).is_ok());
    }

    #[test]
    fn rejects_empty_and_braceless_output() {
        assert!(matches!(
            parse_report("   "),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_report("I cannot help with that."),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_schema_invalid_output() {
        let raw = r#"{ "wellness_age": 38, "metrics": { "wellness_score": { "value": 300 } }, "plan": [{ "day": 1, "theme": "x" }] }"#;
        assert!(matches!(
            parse_report(raw),
            Err(GenerationError::SchemaInvalid(_))
        ));
    }
}
