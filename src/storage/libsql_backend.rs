//! libSQL backend — relational storage for flags, feedback and results.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database as LibSqlDatabase};
use tracing::{debug, info};
use uuid::Uuid;

use super::{FeedbackRecord, ResultRecord, Storage, UserFlags};
use crate::error::StorageError;
use crate::report::GradeReport;

/// libSQL storage backend.
///
/// A single connection is reused for all operations; `libsql::Connection`
/// is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStorage {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStorage {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Open(format!("create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("open libSQL database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "libSQL storage opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StorageError::Open(format!("open in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StorageError::Open(format!("create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS user_flags (
                    user_id TEXT PRIMARY KEY,
                    paid INTEGER NOT NULL DEFAULT 0,
                    free_used INTEGER NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS feedback (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    username TEXT NOT NULL,
                    language TEXT NOT NULL,
                    question TEXT,
                    answer TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_feedback_user ON feedback(user_id);

                CREATE TABLE IF NOT EXISTS results (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    username TEXT NOT NULL,
                    language TEXT NOT NULL,
                    grade TEXT NOT NULL,
                    summary TEXT NOT NULL,
                    report TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_results_user ON results(user_id);",
            )
            .await
            .map_err(|e| StorageError::Query(format!("init_schema: {e}")))?;
        Ok(())
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse an RFC 3339 string, falling back to the epoch sentinel.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

#[async_trait]
impl Storage for LibSqlStorage {
    async fn get_flags(&self, user_id: &str) -> Result<UserFlags, StorageError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT paid, free_used, updated_at FROM user_flags WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| StorageError::Query(format!("get_flags: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let paid: i64 = row.get(0).unwrap_or(0);
                let free_used: i64 = row.get(1).unwrap_or(0);
                let updated_str: String = row.get(2).unwrap_or_default();
                Ok(UserFlags {
                    paid: paid != 0,
                    free_used: free_used != 0,
                    updated_at: parse_datetime(&updated_str),
                })
            }
            Ok(None) => Ok(UserFlags::default()),
            Err(e) => Err(StorageError::Query(format!("get_flags: {e}"))),
        }
    }

    async fn put_flags(
        &self,
        user_id: &str,
        paid: bool,
        free_used: bool,
    ) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO user_flags (user_id, paid, free_used, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET
                    paid = excluded.paid,
                    free_used = excluded.free_used,
                    updated_at = excluded.updated_at",
                params![user_id, paid as i64, free_used as i64, now],
            )
            .await
            .map_err(|e| StorageError::Query(format!("put_flags: {e}")))?;

        debug!(user_id, paid, free_used, "Flags upserted");
        Ok(())
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StorageError> {
        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO feedback (id, user_id, username, language, question, answer, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    record.user_id.clone(),
                    record.username.clone(),
                    record.language.clone(),
                    opt_text(record.question.as_deref()),
                    record.answer.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("append_feedback: {e}")))?;
        Ok(())
    }

    async fn append_result(&self, record: &ResultRecord) -> Result<(), StorageError> {
        let report_json = serde_json::to_string(&record.report)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO results (id, user_id, username, language, grade, summary, report, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    record.user_id.clone(),
                    record.username.clone(),
                    record.language.clone(),
                    record.grade.clone(),
                    record.summary.clone(),
                    report_json,
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StorageError::Query(format!("append_result: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_reads_all_false() {
        let store = LibSqlStorage::new_memory().await.unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(!flags.paid);
        assert!(!flags.free_used);
    }

    #[tokio::test]
    async fn put_flags_upserts() {
        let store = LibSqlStorage::new_memory().await.unwrap();

        store.put_flags("42", false, true).await.unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(!flags.paid);
        assert!(flags.free_used);
        assert!(flags.updated_at > DateTime::<Utc>::MIN_UTC);

        store.put_flags("42", true, true).await.unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(flags.paid);
        assert!(flags.free_used);
    }

    #[tokio::test]
    async fn feedback_and_results_insert() {
        let store = LibSqlStorage::new_memory().await.unwrap();

        store
            .append_feedback(&FeedbackRecord {
                user_id: "1".to_string(),
                username: "Ann".to_string(),
                language: "en".to_string(),
                question: Some("What could be better?".to_string()),
                answer: "More questions".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let report = GradeReport::from_raw_text("verdict");
        store
            .append_result(&ResultRecord {
                user_id: "1".to_string(),
                username: "Ann".to_string(),
                language: "en".to_string(),
                grade: report.grade.to_string(),
                summary: report.summary.clone(),
                report,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut rows = store
            .conn()
            .query("SELECT COUNT(*) FROM feedback", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert_eq!(count, 1);
    }
}
