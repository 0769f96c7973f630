//! Persistence layer — durable per-user flags plus append-only
//! feedback and interview-result logs.
//!
//! The coordinator only sees the `Storage` trait; whether records live in
//! a libSQL database or flat JSON files is decided once at startup.

pub mod json_file;
pub mod libsql_backend;

pub use json_file::JsonFileStorage;
pub use libsql_backend::LibSqlStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::report::GradeReport;

/// Durable per-user gating flags. Unknown users read as all-false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFlags {
    pub paid: bool,
    pub free_used: bool,
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

impl Default for UserFlags {
    fn default() -> Self {
        Self {
            paid: false,
            free_used: false,
            updated_at: epoch(),
        }
    }
}

/// One captured piece of user feedback. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user_id: String,
    pub username: String,
    pub language: String,
    /// The prompt the user was answering, when one was shown.
    #[serde(default)]
    pub question: Option<String>,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

/// One completed interview result. Write-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub user_id: String,
    pub username: String,
    pub language: String,
    pub grade: String,
    pub summary: String,
    pub report: GradeReport,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence contract.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a user's flags; users never seen before read as all-false.
    async fn get_flags(&self, user_id: &str) -> Result<UserFlags, StorageError>;

    /// Upsert a user's flags, stamping `updated_at`.
    async fn put_flags(&self, user_id: &str, paid: bool, free_used: bool)
        -> Result<(), StorageError>;

    /// Append a feedback record.
    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StorageError>;

    /// Append an interview-result record.
    async fn append_result(&self, record: &ResultRecord) -> Result<(), StorageError>;
}
