use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::info;

use crate::{
    error::{FlowError, Result},
    session::{SessionPatch, SessionRecord, now_rfc3339},
    storage::{SessionStore, staleness_cutoff},
};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id  TEXT PRIMARY KEY,
    doc JSONB NOT NULL
)
"#;

const CREATE_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS sessions_report_status_idx
    ON sessions ((doc->>'report_status'))
"#;

// Top-level fields overwrite; answers/events merge key-wise and errors
// append, matching SessionPatch::apply.
const UPDATE_DOC: &str = r#"
UPDATE sessions
SET doc = (doc || $2)
    || jsonb_build_object('answers',
        coalesce(doc->'answers', '{}'::jsonb) || coalesce($2->'answers', '{}'::jsonb))
    || jsonb_build_object('events',
        coalesce(doc->'events', '{}'::jsonb) || coalesce($2->'events', '{}'::jsonb))
    || jsonb_build_object('errors',
        coalesce(doc->'errors', '[]'::jsonb) || coalesce($2->'errors', '[]'::jsonb))
WHERE id = $1
"#;

const CLAIM_GENERATION: &str = r#"
UPDATE sessions
SET doc = doc || jsonb_build_object('report_status', 'processing', 'updated_at', $2::text)
WHERE id = $1
  AND coalesce(doc->>'report_status', 'unset') IN ('unset', 'queued', 'error')
"#;

const TAKE_RETRY_BATCH: &str = r#"
WITH candidates AS (
    SELECT id FROM sessions
    WHERE doc->>'payment_status' = 'succeeded'
      AND coalesce(doc->>'report_status', 'unset') <> 'complete'
      AND (
          coalesce((doc->>'needs_attention')::boolean, false)
          OR doc->>'report_status' = 'error'
          OR (doc->>'report_status' IN ('queued', 'processing')
              AND coalesce(doc->>'updated_at', '') < $1)
      )
    ORDER BY doc->>'updated_at'
    LIMIT $2
    FOR UPDATE SKIP LOCKED
)
UPDATE sessions s
SET doc = s.doc || jsonb_build_object('report_status', 'queued', 'updated_at', $3::text)
FROM candidates c
WHERE s.id = c.id
RETURNING s.id
"#;

/// PostgreSQL implementation of SessionStore. Each session is a single
/// JSONB document; every update is one statement, so per-record atomicity
/// comes from the database.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_STATUS_INDEX).execute(&pool).await?;
        info!("connected to PostgreSQL session store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, record: SessionRecord) -> Result<()> {
        let doc = serde_json::to_value(&record)?;
        sqlx::query("INSERT INTO sessions (id, doc) VALUES ($1, $2)")
            .bind(&record.id)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query("SELECT doc FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let doc: Value = row.get("doc");
                Ok(Some(serde_json::from_value(doc)?))
            }
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, patch: SessionPatch) -> Result<()> {
        let mut doc = serde_json::to_value(&patch)?;
        if let Some(fields) = doc.as_object_mut() {
            fields.insert("updated_at".to_string(), Value::String(now_rfc3339()));
        }
        let result = sqlx::query(UPDATE_DOC)
            .bind(id)
            .bind(doc)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FlowError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn try_claim_generation(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(CLAIM_GENERATION)
            .bind(id)
            .bind(now_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn take_retry_batch(&self, stale_after: Duration, limit: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(TAKE_RETRY_BATCH)
            .bind(staleness_cutoff(stale_after))
            .bind(limit as i64)
            .bind(now_rfc3339())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("id")).collect())
    }
}
