//! Grading — turns a finished interview into a structured report.

use async_trait::async_trait;

use super::{ChatMessage, LlmClient};
use crate::dialog::session::{Role, Turn};
use crate::dialog::texts::Lang;
use crate::error::GeneratorError;
use crate::report::GradeReport;

const GRADE_OPTIONS: &str = "Junior, Middle, Senior, Lead, Head/Art Director, Design Director";

/// Produces a grade report from the full interview history.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(
        &self,
        history: &[Turn],
        context: Option<&str>,
        language: Lang,
    ) -> Result<GradeReport, GeneratorError>;
}

/// Chat-completions-backed grader.
pub struct LlmGrader {
    client: LlmClient,
}

impl LlmGrader {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

fn grading_prompt(language: Lang) -> String {
    format!(
        "You are a lead product designer. Using the interview transcript, \
         assess the designer and return JSON with: grade, summary, \
         strengths (list), weaknesses (list), recommendations (list), \
         materials (list of {{title, url}}), detailed_report. \
         The detailed_report must be significantly longer and more specific \
         than summary. Choose grade only from: {GRADE_OPTIONS}. \
         Answer in this language: {}.",
        language.name(),
    )
}

fn format_history(history: &[Turn]) -> String {
    let mut lines = Vec::new();
    for turn in history {
        if turn.text.is_empty() {
            continue;
        }
        let prefix = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        lines.push(format!("{prefix}: {}", turn.text));
    }
    lines.join("\n")
}

/// Pull the first JSON object out of a model reply, tolerating prose or
/// code fences around it.
fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Some(value);
        }
    }

    let re = regex::Regex::new(r"(?s)\{.*\}").expect("static pattern");
    let candidate = re.find(trimmed)?.as_str();
    serde_json::from_str(candidate).ok()
}

/// Parse a raw model reply into a report. Non-JSON output degrades to a
/// raw-text report rather than an error.
fn parse_report(text: &str) -> GradeReport {
    match extract_json(text) {
        Some(value) => {
            serde_json::from_value(value).unwrap_or_else(|_| GradeReport::from_raw_text(text))
        }
        None => GradeReport::from_raw_text(text),
    }
}

#[async_trait]
impl Grader for LlmGrader {
    async fn grade(
        &self,
        history: &[Turn],
        context: Option<&str>,
        language: Lang,
    ) -> Result<GradeReport, GeneratorError> {
        let mut prompt = grading_prompt(language);
        if let Some(ctx) = context {
            prompt.push_str("\n\nCompetency matrices:\n");
            prompt.push_str(ctx);
        }
        let transcript = format_history(history);
        if !transcript.is_empty() {
            prompt.push_str("\n\nConversation:\n");
            prompt.push_str(&transcript);
        }

        let reply = self
            .client
            .chat(&[ChatMessage::user(prompt)], 0.4)
            .await?;

        if reply.is_empty() {
            return Err(GeneratorError::EmptyResponse(
                "grading returned no text".to_string(),
            ));
        }

        Ok(parse_report(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::GradeLabel;

    #[test]
    fn extracts_bare_json() {
        let value = extract_json(r#"{"grade":"Senior"}"#).unwrap();
        assert_eq!(value["grade"], "Senior");
    }

    #[test]
    fn extracts_json_inside_prose() {
        let text = "Here is the assessment:\n```json\n{\"grade\": \"Lead\", \"summary\": \"ok\"}\n```\nDone.";
        let value = extract_json(text).unwrap();
        assert_eq!(value["grade"], "Lead");
    }

    #[test]
    fn no_json_yields_none() {
        assert!(extract_json("plain verdict, no structure").is_none());
    }

    #[test]
    fn parse_report_defaults_missing_fields() {
        let report = parse_report(r#"{"grade":"Middle","summary":"fine"}"#);
        assert_eq!(report.grade, GradeLabel::Middle);
        assert_eq!(report.summary, "fine");
        assert!(report.strengths.is_empty());
        assert!(report.materials.is_empty());
    }

    #[test]
    fn parse_report_falls_back_to_raw_text() {
        let report = parse_report("You are somewhere between Middle and Senior.");
        assert_eq!(report.grade, GradeLabel::Unknown);
        assert_eq!(report.summary, "You are somewhere between Middle and Senior.");
        assert_eq!(report.detailed_report, report.summary);
    }

    #[test]
    fn history_formatting_skips_empty_turns() {
        let history = vec![
            Turn {
                role: Role::Assistant,
                text: "What do you design?".to_string(),
            },
            Turn {
                role: Role::User,
                text: String::new(),
            },
            Turn {
                role: Role::User,
                text: "Mobile apps".to_string(),
            },
        ];
        let formatted = format_history(&history);
        assert_eq!(formatted, "Assistant: What do you design?\nUser: Mobile apps");
    }
}
