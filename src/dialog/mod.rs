//! Session coordinator — the interview state machine.
//!
//! Owns per-user conversation state and sequences the generator,
//! renderer, transport and storage calls for each inbound update. All
//! collaborators are injected as trait objects so tests can stub them.

pub mod session;
pub mod texts;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::llm::{Grader, QuestionGenerator};
use crate::report::{pdf, GradeReport};
use crate::storage::{FeedbackRecord, ResultRecord, Storage, UserFlags};
use crate::telegram::{Transport, Update};

use session::{Session, SessionState, SessionStore, Turn};
use texts::Lang;

/// Injected collaborators for the coordinator.
pub struct CoordinatorDeps {
    pub transport: Arc<dyn Transport>,
    pub questions: Arc<dyn QuestionGenerator>,
    pub grader: Arc<dyn Grader>,
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<dyn SessionStore>,
}

/// Drives one user's interview per inbound update.
pub struct Coordinator {
    transport: Arc<dyn Transport>,
    questions: Arc<dyn QuestionGenerator>,
    grader: Arc<dyn Grader>,
    storage: Arc<dyn Storage>,
    sessions: Arc<dyn SessionStore>,
    min_answers: usize,
    reports_dir: PathBuf,
}

impl Coordinator {
    pub fn new(deps: CoordinatorDeps, min_answers: usize, reports_dir: PathBuf) -> Self {
        Self {
            transport: deps.transport,
            questions: deps.questions,
            grader: deps.grader,
            storage: deps.storage,
            sessions: deps.sessions,
            min_answers,
            reports_dir,
        }
    }

    /// Handle one inbound update envelope end to end.
    pub async fn handle_update(&self, update: Update) -> Result<()> {
        let Some(inbound) = update.into_inbound() else {
            return Ok(());
        };

        // Callback buttons are one-shot; strip the keyboard they came from.
        if let Some(message_id) = inbound.callback_message_id {
            self.transport
                .remove_inline_keyboard(&inbound.chat_id, message_id)
                .await;
        }

        let entry = match self.sessions.get(&inbound.user_id).await {
            Some(entry) => entry,
            None => {
                let flags = match self.storage.get_flags(&inbound.user_id).await {
                    Ok(flags) => flags,
                    Err(e) => {
                        warn!(error = %e, user_id = %inbound.user_id, "Failed to load flags; assuming fresh user");
                        UserFlags::default()
                    }
                };
                let language = inbound
                    .language_code
                    .as_deref()
                    .map(Lang::from_code)
                    .unwrap_or_default();
                self.sessions
                    .get_or_create(&inbound.user_id, language, flags)
                    .await
            }
        };

        // Holding the entry lock for the whole update serializes rapid
        // double-sends from the same user.
        let mut session = entry.lock().await;
        if !inbound.first_name.is_empty() {
            session.username = inbound.first_name.clone();
        }

        self.dispatch(&mut session, &inbound.chat_id, &inbound.text)
            .await
    }

    async fn dispatch(&self, session: &mut Session, chat_id: &str, text: &str) -> Result<()> {
        let lang = session.language;

        if let Some(command) = parse_command(text) {
            return self.dispatch_command(session, chat_id, command).await;
        }

        // Transient overlays consume plain text before the main state.
        if session.awaiting_language {
            return self.handle_language_choice(session, chat_id, text).await;
        }
        if session.awaiting_feedback {
            return self.handle_feedback_answer(session, chat_id, text).await;
        }

        match session.state {
            SessionState::Collecting => self.handle_answer(session, chat_id, text).await,
            SessionState::Idle => {
                self.transport
                    .send_text(chat_id, texts::start_hint(lang))
                    .await?;
                Ok(())
            }
            SessionState::Completed => {
                self.transport
                    .send_text(chat_id, texts::retake_hint(lang))
                    .await?;
                Ok(())
            }
        }
    }

    async fn dispatch_command(
        &self,
        session: &mut Session,
        chat_id: &str,
        command: &str,
    ) -> Result<()> {
        let lang = session.language;
        match command {
            "start" => self.cmd_start(session, chat_id).await,
            "reset" => {
                session.reset();
                self.transport
                    .send_text(chat_id, texts::reset_done(lang))
                    .await?;
                Ok(())
            }
            "language" => {
                session.awaiting_language = true;
                session.awaiting_feedback = false;
                self.transport
                    .send_text(chat_id, texts::language_prompt(lang))
                    .await?;
                Ok(())
            }
            "feedback" => {
                session.awaiting_feedback = true;
                session.awaiting_language = false;
                self.transport
                    .send_text(chat_id, texts::feedback_prompt(lang))
                    .await?;
                Ok(())
            }
            "pay" => self.cmd_pay(session, chat_id).await,
            "grade" => self.cmd_grade(session, chat_id).await,
            _ => {
                self.transport
                    .send_text(chat_id, texts::unknown_command(lang))
                    .await?;
                Ok(())
            }
        }
    }

    /// `/start` — gate on the free-trial/paid flags, then open the
    /// interview with the first generated question.
    async fn cmd_start(&self, session: &mut Session, chat_id: &str) -> Result<()> {
        let lang = session.language;

        // Persisted flags are the source of truth for the gate.
        match self.storage.get_flags(&session.user_id).await {
            Ok(flags) => session.apply_flags(flags),
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "Failed to reload flags; using cached values");
            }
        }

        if !session.can_start() {
            self.transport
                .send_text(chat_id, texts::payment_required(lang))
                .await?;
            return Ok(());
        }

        session.reset();
        self.transport
            .send_text(chat_id, &texts::intro(lang, &session.username))
            .await?;

        match self
            .questions
            .next_question(&session.history, None, lang, self.min_answers)
            .await
        {
            Ok(Some(question)) => {
                session.history.push(Turn::assistant(&question));
                session.state = SessionState::Collecting;
                self.transport.send_text(chat_id, &question).await?;
            }
            Ok(None) => {
                // Completion before a single answer; the floor policy
                // substitutes an opener instead.
                let question = texts::fallback_question(lang, 0);
                session.history.push(Turn::assistant(question));
                session.state = SessionState::Collecting;
                self.transport.send_text(chat_id, question).await?;
            }
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "Question generation failed on start");
                session.state = SessionState::Idle;
                self.transport
                    .send_text(chat_id, texts::generator_failed(lang))
                    .await?;
            }
        }
        Ok(())
    }

    /// A plain-text answer while collecting.
    async fn handle_answer(&self, session: &mut Session, chat_id: &str, text: &str) -> Result<()> {
        let lang = session.language;
        session.history.push(Turn::user(text));

        match self
            .questions
            .next_question(&session.history, None, lang, self.min_answers)
            .await
        {
            Ok(Some(question)) => {
                session.history.push(Turn::assistant(&question));
                self.transport.send_text(chat_id, &question).await?;
            }
            Ok(None) => {
                let answers = session.user_answer_count();
                if answers < self.min_answers {
                    let question = texts::fallback_question(lang, answers);
                    info!(
                        answers,
                        min_answers = self.min_answers,
                        "Generator finished early; substituting fallback question"
                    );
                    session.history.push(Turn::assistant(question));
                    self.transport.send_text(chat_id, question).await?;
                } else {
                    self.finalize(session, chat_id).await?;
                }
            }
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "Question generation failed");
                self.transport
                    .send_text(chat_id, texts::generator_failed(lang))
                    .await?;
            }
        }
        Ok(())
    }

    /// The generator signalled a genuine completion: grade, persist,
    /// and deliver according to the paid gate.
    async fn finalize(&self, session: &mut Session, chat_id: &str) -> Result<()> {
        let lang = session.language;
        self.transport
            .send_text(chat_id, texts::grading_in_progress(lang))
            .await?;

        let report = match self.grader.grade(&session.history, None, lang).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, user_id = %session.user_id, "Grading failed");
                self.transport
                    .send_text(chat_id, texts::grading_failed(lang))
                    .await?;
                return Ok(());
            }
        };

        session.state = SessionState::Completed;
        session.free_used = true;
        session.last_report = Some(report.clone());

        let mut save_failed = false;
        if let Err(e) = self
            .storage
            .put_flags(&session.user_id, session.paid, true)
            .await
        {
            error!(error = %e, user_id = %session.user_id, "Failed to persist flags");
            save_failed = true;
        }

        let record = ResultRecord {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            language: lang.code().to_string(),
            grade: report.grade.to_string(),
            summary: report.summary.clone(),
            report: report.clone(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.storage.append_result(&record).await {
            error!(error = %e, user_id = %session.user_id, "Failed to append result record");
            save_failed = true;
        }
        if save_failed {
            self.transport
                .send_text(chat_id, texts::could_not_save(lang))
                .await?;
        }

        self.transport
            .send_text(
                chat_id,
                &texts::completion_summary(lang, report.grade.as_str(), &report.summary),
            )
            .await?;

        if session.paid {
            self.deliver_report(session, chat_id, &report).await?;
        } else {
            self.transport
                .send_text(chat_id, texts::locked_notice(lang))
                .await?;
        }

        self.transport
            .send_text_with_keyboard(chat_id, texts::retake_hint(lang), &["/start"])
            .await?;
        Ok(())
    }

    /// Render the PDF off the async path and send it as a document.
    async fn deliver_report(
        &self,
        session: &Session,
        chat_id: &str,
        report: &GradeReport,
    ) -> Result<()> {
        let lang = session.language;
        let report = report.clone();
        let username = session.username.clone();
        let dir = self.reports_dir.clone();

        let rendered =
            tokio::task::spawn_blocking(move || pdf::write_report_pdf(&report, &username, &dir))
                .await;

        match rendered {
            Ok(Ok(path)) => {
                self.transport
                    .send_document(chat_id, &path, Some(texts::report_caption(lang)))
                    .await?;
            }
            Ok(Err(e)) => {
                error!(error = %e, user_id = %session.user_id, "PDF rendering failed");
                self.transport
                    .send_text(chat_id, texts::report_failed(lang))
                    .await?;
            }
            Err(e) => {
                error!(error = %e, user_id = %session.user_id, "PDF rendering task failed");
                self.transport
                    .send_text(chat_id, texts::report_failed(lang))
                    .await?;
            }
        }
        Ok(())
    }

    /// `/pay` — flip the paid flag and deliver a pending report.
    async fn cmd_pay(&self, session: &mut Session, chat_id: &str) -> Result<()> {
        let lang = session.language;
        session.paid = true;

        if let Err(e) = self
            .storage
            .put_flags(&session.user_id, true, session.free_used)
            .await
        {
            error!(error = %e, user_id = %session.user_id, "Failed to persist paid flag");
            self.transport
                .send_text(chat_id, texts::could_not_save(lang))
                .await?;
        }

        self.transport
            .send_text(chat_id, texts::pay_confirmed(lang))
            .await?;

        if session.state == SessionState::Completed {
            if let Some(report) = session.last_report.clone() {
                self.deliver_report(session, chat_id, &report).await?;
            }
        }
        Ok(())
    }

    /// `/grade` — re-deliver the most recent report under the paid gate.
    async fn cmd_grade(&self, session: &mut Session, chat_id: &str) -> Result<()> {
        let lang = session.language;
        match session.last_report.clone() {
            Some(report) if session.paid => self.deliver_report(session, chat_id, &report).await,
            Some(_) => {
                self.transport
                    .send_text(chat_id, texts::locked_notice(lang))
                    .await?;
                Ok(())
            }
            None => {
                self.transport
                    .send_text(chat_id, texts::no_report_yet(lang))
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_language_choice(
        &self,
        session: &mut Session,
        chat_id: &str,
        text: &str,
    ) -> Result<()> {
        match Lang::parse_choice(text) {
            Some(chosen) => {
                session.language = chosen;
                session.awaiting_language = false;
                self.transport
                    .send_text(chat_id, &texts::language_set(chosen))
                    .await?;
            }
            None => {
                // Reprompt; the overlay stays armed.
                self.transport
                    .send_text(chat_id, texts::language_invalid(session.language))
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_feedback_answer(
        &self,
        session: &mut Session,
        chat_id: &str,
        text: &str,
    ) -> Result<()> {
        let lang = session.language;
        session.awaiting_feedback = false;

        let record = FeedbackRecord {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            language: lang.code().to_string(),
            question: Some(texts::feedback_prompt(lang).to_string()),
            answer: text.to_string(),
            created_at: Utc::now(),
        };

        match self.storage.append_feedback(&record).await {
            Ok(()) => {
                self.transport
                    .send_text(chat_id, texts::feedback_thanks(lang))
                    .await?;
            }
            Err(e) => {
                error!(error = %e, user_id = %session.user_id, "Failed to append feedback");
                self.transport
                    .send_text(chat_id, texts::could_not_save(lang))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Extract a command name from a message: the first token, without the
/// leading slash or a `@botname` suffix.
fn parse_command(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    command.split('@').next().filter(|c| !c.is_empty())
}
