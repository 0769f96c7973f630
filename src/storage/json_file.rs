//! Flat-file storage — the always-available fallback backend.
//!
//! Layout under the data directory: `flags.json` holds a map of user id →
//! flags, `feedback.jsonl` and `results.jsonl` grow one JSON object per
//! line. A single mutex serializes writers within the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::{FeedbackRecord, ResultRecord, Storage, UserFlags};
use crate::error::StorageError;

pub struct JsonFileStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Open (or create) the storage directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| StorageError::Open(format!("{}: {e}", root.display())))?;
        info!(path = %root.display(), "File storage opened");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn flags_path(&self) -> PathBuf {
        self.root.join("flags.json")
    }

    async fn read_flags_map(&self) -> Result<HashMap<String, UserFlags>, StorageError> {
        match tokio::fs::read(self.flags_path()).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_line<T: serde::Serialize>(
        &self,
        filename: &str,
        record: &T,
    ) -> Result<(), StorageError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(filename))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn get_flags(&self, user_id: &str) -> Result<UserFlags, StorageError> {
        let map = self.read_flags_map().await?;
        Ok(map.get(user_id).copied().unwrap_or_default())
    }

    async fn put_flags(
        &self,
        user_id: &str,
        paid: bool,
        free_used: bool,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        // Re-read under the lock so concurrent writers never drop entries.
        let mut map = match tokio::fs::read(self.flags_path()).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<String, UserFlags>>(&bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        map.insert(
            user_id.to_string(),
            UserFlags {
                paid,
                free_used,
                updated_at: Utc::now(),
            },
        );

        let bytes = serde_json::to_vec_pretty(&map)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        tokio::fs::write(self.flags_path(), bytes).await?;
        Ok(())
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<(), StorageError> {
        self.append_line("feedback.jsonl", record).await
    }

    async fn append_result(&self, record: &ResultRecord) -> Result<(), StorageError> {
        self.append_line("results.jsonl", record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GradeReport;

    #[tokio::test]
    async fn unknown_user_reads_all_false() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStorage::new(tmp.path()).unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(!flags.paid);
        assert!(!flags.free_used);
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStorage::new(tmp.path()).unwrap();

        store.put_flags("42", false, true).await.unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(!flags.paid);
        assert!(flags.free_used);

        store.put_flags("42", true, true).await.unwrap();
        let flags = store.get_flags("42").await.unwrap();
        assert!(flags.paid);
        assert!(flags.free_used);

        // Other users are untouched.
        let other = store.get_flags("7").await.unwrap();
        assert!(!other.paid && !other.free_used);
    }

    #[tokio::test]
    async fn feedback_appends_one_line_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStorage::new(tmp.path()).unwrap();

        for i in 0..3 {
            store
                .append_feedback(&FeedbackRecord {
                    user_id: "1".to_string(),
                    username: "Ann".to_string(),
                    language: "en".to_string(),
                    question: None,
                    answer: format!("note {i}"),
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let content = std::fs::read_to_string(tmp.path().join("feedback.jsonl")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: FeedbackRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.answer, "note 0");
    }

    #[tokio::test]
    async fn result_record_preserves_report() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStorage::new(tmp.path()).unwrap();

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

        let content = std::fs::read_to_string(tmp.path().join("results.jsonl")).unwrap();
        let record: ResultRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record.report.summary, "verdict");
    }
}
