use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current time as a fixed-width RFC 3339 UTC string.
///
/// Stored timestamps compare lexicographically, which the staleness queries
/// in the stores rely on.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Payment lifecycle of a session. Terminal-event retries are idempotent
/// no-ops; `Succeeded` is never regressed by a late `Failed`/`Canceled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

/// Report tier the user paid for; selects the day-plan length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Basic,
    Advanced,
    Premium,
}

impl PlanType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "advanced" => Some(Self::Advanced),
            "premium" => Some(Self::Premium),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Premium => "premium",
        }
    }
}

/// Report generation state machine:
/// `unset → queued → processing → {complete | error}`.
/// `error` may re-enter `queued`; nothing leaves `complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Unset,
    Queued,
    Processing,
    Complete,
    Error,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

/// Per-region skin severity scores (0-100) from the face-analysis
/// collaborator. Absent indicators default to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
    #[serde(default)]
    pub eye_pouch: f64,
    #[serde(default)]
    pub dark_circle: f64,
    #[serde(default)]
    pub eye_finelines: f64,
    #[serde(default)]
    pub crows_feet: f64,
    #[serde(default)]
    pub forehead_wrinkle: f64,
    #[serde(default)]
    pub glabella_wrinkle: f64,
    #[serde(default)]
    pub nasolabial_fold: f64,
    #[serde(default)]
    pub blackhead: f64,
    #[serde(default)]
    pub acne: f64,
    #[serde(default)]
    pub skin_spot: f64,
}

/// Structured photo attributes for a session; set at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_estimate: Option<u32>,
    #[serde(default)]
    pub skin: SkinStatus,
}

/// A client-reported error, appended to the session for support tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientErrorRecord {
    pub at: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// The central session aggregate. One document per quiz-taker, from first
/// answer through payment to the finished report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub answers: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_analysis: Option<PhotoAnalysis>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    #[serde(default)]
    pub report_status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
    #[serde(default)]
    pub needs_attention: bool,
    #[serde(default)]
    pub events: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<ClientErrorRecord>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: id.into(),
            created_at: now.clone(),
            updated_at: now,
            answers: Map::new(),
            photo_analysis: None,
            payment_status: PaymentStatus::default(),
            payment_amount: None,
            payment_method: None,
            payment_ref: None,
            plan_type: None,
            report_status: ReportStatus::default(),
            report_data: None,
            report_error: None,
            needs_attention: false,
            events: BTreeMap::new(),
            errors: Vec::new(),
        }
    }
}

/// Partial update applied to a session with field-level merge semantics:
/// `answers` and `events` merge key-wise, `errors` append, everything else
/// overwrites when present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_analysis: Option<PhotoAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_status: Option<ReportStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_attention: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ClientErrorRecord>>,
}

impl SessionPatch {
    /// Record a milestone timestamp alongside the rest of the patch.
    pub fn with_event(mut self, name: &str) -> Self {
        self.events
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), now_rfc3339());
        self
    }

    pub fn apply(&self, record: &mut SessionRecord) {
        if let Some(answers) = &self.answers {
            for (key, value) in answers {
                record.answers.insert(key.clone(), value.clone());
            }
        }
        if let Some(photo) = &self.photo_analysis {
            record.photo_analysis = Some(photo.clone());
        }
        if let Some(status) = self.payment_status {
            record.payment_status = status;
        }
        if let Some(amount) = &self.payment_amount {
            record.payment_amount = Some(amount.clone());
        }
        if let Some(method) = &self.payment_method {
            record.payment_method = Some(method.clone());
        }
        if let Some(reference) = &self.payment_ref {
            record.payment_ref = Some(reference.clone());
        }
        if let Some(plan) = self.plan_type {
            record.plan_type = Some(plan);
        }
        if let Some(status) = self.report_status {
            record.report_status = status;
        }
        if let Some(data) = &self.report_data {
            record.report_data = Some(data.clone());
        }
        if let Some(error) = &self.report_error {
            record.report_error = Some(error.clone());
        }
        if let Some(flag) = self.needs_attention {
            record.needs_attention = flag;
        }
        if let Some(events) = &self.events {
            for (name, at) in events {
                record.events.insert(name.clone(), at.clone());
            }
        }
        if let Some(errors) = &self.errors {
            record.errors.extend(errors.iter().cloned());
        }
        record.updated_at = now_rfc3339();
    }
}
