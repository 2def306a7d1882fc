//! The canonical report contract.
//!
//! Both the model-generated path and the deterministic fallback must produce
//! a value of this shape; `validate` is the single gate deciding whether a
//! parsed report is usable.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const REPORT_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Error)]
#[error("report schema violation: {0}")]
pub struct SchemaViolation(pub String);

/// Accepts plain numbers and numeric strings ("72", "22.5 (Healthy)"); the
/// generative model has produced both.
fn flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => {
            let leading: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            leading
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("expected a number, got {s:?}")))
        }
    }
}

fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_f64(deserializer).map(|v| v.round() as i64)
}

fn flexible_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_f64(deserializer).map(|v| v.round() as i32)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    #[serde(deserialize_with = "flexible_f64")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Metric {
    pub fn new(value: f64, description: &str) -> Self {
        Self {
            value,
            description: Some(description.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub wellness_score: Metric,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hydration: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_quality: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<Metric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy_habits: Option<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insights {
    pub stress_sleep: String,
    pub nutrition_hydration: String,
    pub activity: String,
}

/// Binary per-indicator findings plus the free-text conclusion lives in
/// `ReportData::skin_conclusion`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinFindings {
    #[serde(default)]
    pub dark_circle: u8,
    #[serde(default)]
    pub eye_pouch: u8,
    #[serde(default)]
    pub eye_finelines: u8,
    #[serde(default)]
    pub crows_feet: u8,
    #[serde(default)]
    pub forehead_wrinkle: u8,
    #[serde(default)]
    pub glabella_wrinkle: u8,
    #[serde(default)]
    pub nasolabial_fold: u8,
    #[serde(default)]
    pub blackhead: u8,
    #[serde(default)]
    pub acne: u8,
    #[serde(default)]
    pub skin_spot: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDay {
    pub day: u32,
    pub theme: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub morning: String,
    #[serde(default)]
    pub nutrition: String,
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub evening: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Potential {
    #[serde(deserialize_with = "flexible_i64")]
    pub age: i64,
    #[serde(deserialize_with = "flexible_i64")]
    pub lifespan: i64,
}

fn default_schema_version() -> String {
    REPORT_SCHEMA_VERSION.to_string()
}

fn default_user_name() -> String {
    "Valued User".to_string()
}

fn default_chrono_age() -> u32 {
    35
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_user_name")]
    pub user_name: String,
    #[serde(default = "default_chrono_age")]
    pub chrono_age: u32,
    #[serde(deserialize_with = "flexible_i64")]
    pub wellness_age: i64,
    #[serde(default, deserialize_with = "flexible_i32")]
    pub age_correction: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_explanation: Option<String>,
    #[serde(default)]
    pub age_reduction_prediction: String,
    #[serde(default)]
    pub increasing_factors: Vec<String>,
    #[serde(default)]
    pub decreasing_factors: Vec<String>,
    pub metrics: ReportMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_analysis: Option<SkinFindings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<Archetype>,
    #[serde(default)]
    pub plan: Vec<PlanDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential: Option<Potential>,
}

impl ReportData {
    /// Minimum requirements for a report to be shown to a paying user.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let wellness = self.metrics.wellness_score.value;
        if !(1.0..=100.0).contains(&wellness) {
            return Err(SchemaViolation(format!(
                "metrics.wellness_score.value out of range: {wellness}"
            )));
        }
        if self.wellness_age < 1 {
            return Err(SchemaViolation(format!(
                "wellness_age must be positive, got {}",
                self.wellness_age
            )));
        }
        if self.plan.is_empty() {
            return Err(SchemaViolation("plan must not be empty".to_string()));
        }
        Ok(())
    }
}
