//! Per-user session state and the session store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::texts::Lang;
use crate::report::GradeReport;
use crate::storage::UserFlags;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Where a user is in the interview lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Collecting,
    Completed,
}

/// In-memory conversational and gating state for one user.
///
/// Persisted flags are the source of truth for `paid`/`free_used`; the
/// session copies are a cache reconciled on creation and on the
/// state-changing commands.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub language: Lang,
    pub state: SessionState,
    pub history: Vec<Turn>,
    pub paid: bool,
    pub free_used: bool,
    pub awaiting_language: bool,
    pub awaiting_feedback: bool,
    pub last_report: Option<GradeReport>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, language: Lang, flags: UserFlags) -> Self {
        Self {
            user_id: user_id.into(),
            username: String::new(),
            language,
            state: SessionState::Idle,
            history: Vec::new(),
            paid: flags.paid,
            free_used: flags.free_used,
            awaiting_language: false,
            awaiting_feedback: false,
            last_report: None,
        }
    }

    /// Number of answers the user has given so far.
    pub fn user_answer_count(&self) -> usize {
        self.history.iter().filter(|t| t.role == Role::User).count()
    }

    /// Whether a (re)start is allowed under the free-trial/paid gate.
    pub fn can_start(&self) -> bool {
        !self.free_used || self.paid
    }

    /// Clear history and transient flags and return to idle.
    pub fn reset(&mut self) {
        self.history.clear();
        self.awaiting_language = false;
        self.awaiting_feedback = false;
        self.state = SessionState::Idle;
    }

    /// Overwrite cached flags with the persisted truth.
    pub fn apply_flags(&mut self, flags: UserFlags) {
        self.paid = flags.paid;
        self.free_used = flags.free_used;
    }
}

/// Hands out per-user session entries.
///
/// Entries are `Arc<Mutex<Session>>` so the coordinator can hold one
/// user's lock for a whole update, serializing same-user updates while
/// different users proceed concurrently.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up an existing session.
    async fn get(&self, user_id: &str) -> Option<Arc<Mutex<Session>>>;

    /// Fetch the session, creating it from persisted flags when absent.
    async fn get_or_create(
        &self,
        user_id: &str,
        language: Lang,
        flags: UserFlags,
    ) -> Arc<Mutex<Session>>;
}

/// Process-local session map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(user_id).cloned()
    }

    async fn get_or_create(
        &self,
        user_id: &str,
        language: Lang,
        flags: UserFlags,
    ) -> Arc<Mutex<Session>> {
        if let Some(session) = self.get(user_id).await {
            return session;
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; another update may have won.
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(user_id, language, flags))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_logic() {
        let mut session = Session::new("1", Lang::En, UserFlags::default());
        assert!(session.can_start());

        session.free_used = true;
        assert!(!session.can_start());

        session.paid = true;
        assert!(session.can_start());
    }

    #[test]
    fn reset_clears_history_and_overlays() {
        let mut session = Session::new("1", Lang::En, UserFlags::default());
        session.history.push(Turn::assistant("q"));
        session.history.push(Turn::user("a"));
        session.state = SessionState::Collecting;
        session.awaiting_feedback = true;

        session.reset();
        assert!(session.history.is_empty());
        assert!(!session.awaiting_feedback);
        assert_eq!(session.state, SessionState::Idle);

        // Idempotent.
        session.reset();
        assert!(session.history.is_empty());
        assert_eq!(session.state, SessionState::Idle);
    }

    #[test]
    fn answer_count_only_counts_user_turns() {
        let mut session = Session::new("1", Lang::En, UserFlags::default());
        session.history.push(Turn::assistant("q1"));
        session.history.push(Turn::user("a1"));
        session.history.push(Turn::assistant("q2"));
        assert_eq!(session.user_answer_count(), 1);
    }

    #[tokio::test]
    async fn store_creates_once_per_user() {
        let store = InMemorySessionStore::new();
        let flags = UserFlags {
            paid: true,
            ..UserFlags::default()
        };

        let a = store.get_or_create("1", Lang::En, flags).await;
        let b = store
            .get_or_create("1", Lang::Ru, UserFlags::default())
            .await;

        // Same entry; the second call's arguments are ignored.
        assert!(Arc::ptr_eq(&a, &b));
        assert!(b.lock().await.paid);

        assert!(store.get("2").await.is_none());
    }
}
