//! Next-question generation.

use async_trait::async_trait;

use super::{ChatMessage, LlmClient};
use crate::dialog::session::{Role, Turn};
use crate::dialog::texts::Lang;
use crate::error::GeneratorError;

/// Marker the model replies with once the interview has enough material.
const DONE_MARKER: &str = "[DONE]";

/// Produces the next interview question, or `None` once the interview
/// is complete.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn next_question(
        &self,
        history: &[Turn],
        context: Option<&str>,
        language: Lang,
        min_answers: usize,
    ) -> Result<Option<String>, GeneratorError>;
}

/// Chat-completions-backed question generator.
pub struct LlmQuestionGenerator {
    client: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

fn system_prompt(context: Option<&str>, language: Lang, min_answers: usize) -> String {
    let mut prompt = format!(
        "You are a lead product designer interviewing a designer to determine \
         their grade. Ask exactly one question at a time, building on the \
         previous answers. Keep questions short and conversational. \
         Do not number the questions and do not add commentary. \
         Do not end the interview before the candidate has given at least \
         {min_answers} answers; once you have enough material to grade them, \
         reply with exactly {DONE_MARKER} and nothing else. \
         Ask in this language: {}.",
        language.name(),
    );
    if let Some(ctx) = context {
        prompt.push_str("\n\nCompetency matrices:\n");
        prompt.push_str(ctx);
    }
    prompt
}

/// Map a raw model reply onto the generator contract: an empty reply or
/// the done marker ends the interview, anything else is the question.
fn interpret_reply(reply: &str) -> Option<String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() || trimmed.contains(DONE_MARKER) {
        return None;
    }
    Some(trimmed.to_string())
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn next_question(
        &self,
        history: &[Turn],
        context: Option<&str>,
        language: Lang,
        min_answers: usize,
    ) -> Result<Option<String>, GeneratorError> {
        let mut messages = vec![ChatMessage::system(system_prompt(
            context,
            language,
            min_answers,
        ))];
        for turn in history {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(&turn.text),
                Role::Assistant => ChatMessage::assistant(&turn.text),
            });
        }

        let reply = self.client.chat(&messages, 0.7).await?;
        Ok(interpret_reply(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_is_a_question() {
        assert_eq!(
            interpret_reply(" What do you design? "),
            Some("What do you design?".to_string())
        );
    }

    #[test]
    fn empty_reply_means_done() {
        assert_eq!(interpret_reply(""), None);
        assert_eq!(interpret_reply("   \n"), None);
    }

    #[test]
    fn done_marker_means_done_even_with_noise() {
        assert_eq!(interpret_reply("[DONE]"), None);
        assert_eq!(interpret_reply("Thanks! [DONE]"), None);
    }

    #[test]
    fn system_prompt_carries_floor_and_language() {
        let prompt = system_prompt(None, Lang::En, 4);
        assert!(prompt.contains("at least 4 answers"));
        assert!(prompt.contains("English"));

        let prompt = system_prompt(Some("matrix"), Lang::Ru, 6);
        assert!(prompt.contains("matrix"));
    }
}
