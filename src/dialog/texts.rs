//! Interview languages and localized bot copy.

use serde::{Deserialize, Serialize};

/// Languages the interview can run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ru,
    En,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Ru => "ru",
            Lang::En => "en",
        }
    }

    /// Human-readable name, used in prompts and confirmations.
    pub fn name(&self) -> &'static str {
        match self {
            Lang::Ru => "Русский",
            Lang::En => "English",
        }
    }

    /// Map Telegram's `language_code` onto the supported set.
    pub fn from_code(code: &str) -> Self {
        if code.to_lowercase().starts_with("ru") {
            Lang::Ru
        } else {
            Lang::En
        }
    }

    /// Parse a free-text language choice. `None` means unsupported.
    pub fn parse_choice(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "ru" | "rus" | "russian" | "русский" | "рус" => Some(Lang::Ru),
            "en" | "eng" | "english" | "английский" | "англ" => Some(Lang::En),
            _ => None,
        }
    }
}

impl Default for Lang {
    fn default() -> Self {
        Lang::En
    }
}

// ── Bot copy ────────────────────────────────────────────────────────

pub fn intro(lang: Lang, name: &str) -> String {
    let name = if name.is_empty() {
        match lang {
            Lang::Ru => "друг",
            Lang::En => "there",
        }
    } else {
        name
    };
    match lang {
        Lang::Ru => format!(
            "Привет, {name}! Этот бот поможет определить твой дизайнерский \
             грейд через диалог. Отвечай честно и развёрнуто — в конце ты \
             получишь отчёт с оценкой, рекомендациями и материалами."
        ),
        Lang::En => format!(
            "Hi, {name}! This bot figures out your designer grade through a \
             short conversation. Answer honestly and in detail — at the end \
             you'll get a report with your grade, recommendations and \
             reading materials."
        ),
    }
}

pub fn payment_required(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => {
            "Бесплатная попытка уже использована. Повторное прохождение — \
             после оплаты: /pay"
        }
        Lang::En => {
            "Your free attempt has been used. To retake the interview, pay \
             first: /pay"
        }
    }
}

pub fn reset_done(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Сессия сброшена. Чтобы начать заново, отправь /start.",
        Lang::En => "Session reset. Send /start to begin again.",
    }
}

pub fn language_prompt(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "На каком языке проходить интервью? Например: Русский, English.",
        Lang::En => "Which language should the interview run in? For example: English, Русский.",
    }
}

pub fn language_set(lang: Lang) -> String {
    match lang {
        Lang::Ru => format!("Язык установлен: {}", lang.name()),
        Lang::En => format!("Language set: {}", lang.name()),
    }
}

pub fn language_invalid(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Такой язык не поддерживается. Доступны: Русский, English.",
        Lang::En => "That language isn't supported. Available: English, Русский.",
    }
}

pub fn feedback_prompt(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Можешь оставить отзыв о боте или предложить улучшения:",
        Lang::En => "Leave feedback about the bot or suggest improvements:",
    }
}

pub fn feedback_thanks(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Спасибо за отзыв!",
        Lang::En => "Thanks for the feedback!",
    }
}

pub fn could_not_save(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Не получилось сохранить данные. Попробуй ещё раз позже.",
        Lang::En => "Could not save your data. Please try again later.",
    }
}

pub fn generator_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Произошла ошибка при подготовке вопроса. Попробуй позже.",
        Lang::En => "Something went wrong while preparing a question. Please try again later.",
    }
}

pub fn grading_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Не удалось подготовить оценку. Отправь ещё одно сообщение, и я попробую снова.",
        Lang::En => "Could not prepare your assessment. Send another message and I'll try again.",
    }
}

pub fn grading_in_progress(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Спасибо! Формирую результаты...",
        Lang::En => "Thanks! Preparing your results...",
    }
}

pub fn completion_summary(lang: Lang, grade: &str, summary: &str) -> String {
    let header = match lang {
        Lang::Ru => format!("Твой грейд: {grade}"),
        Lang::En => format!("Your grade: {grade}"),
    };
    if summary.is_empty() {
        header
    } else {
        format!("{header}\n\n{summary}")
    }
}

pub fn locked_notice(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => {
            "Полный PDF-отчёт с разбором, рекомендациями и материалами \
             доступен после оплаты: /pay"
        }
        Lang::En => {
            "The full PDF report with the breakdown, recommendations and \
             materials unlocks after payment: /pay"
        }
    }
}

pub fn retake_hint(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Хочешь пройти интервью ещё раз — нажми /start.",
        Lang::En => "Want to retake the interview? Tap /start.",
    }
}

pub fn report_caption(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Твой отчёт по грейду",
        Lang::En => "Your grade report",
    }
}

pub fn report_failed(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Не удалось сформировать PDF-отчёт. Попробуй позже.",
        Lang::En => "Could not produce the PDF report. Please try again later.",
    }
}

pub fn pay_confirmed(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Оплата подтверждена. Спасибо!",
        Lang::En => "Payment confirmed. Thank you!",
    }
}

pub fn no_report_yet(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Сначала нужно пройти интервью. Отправь /start.",
        Lang::En => "You need to finish the interview first. Send /start.",
    }
}

pub fn start_hint(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Пожалуйста, начни с команды /start.",
        Lang::En => "Please start with the /start command.",
    }
}

pub fn unknown_command(lang: Lang) -> &'static str {
    match lang {
        Lang::Ru => "Не знаю такой команды. Доступны: /start, /reset, /language, /feedback, /pay.",
        Lang::En => "Unknown command. Available: /start, /reset, /language, /feedback, /pay.",
    }
}

/// Fallback when an update blows up before the session language is known.
pub fn generic_failure() -> &'static str {
    "Something went wrong. Please try again later."
}

// ── Fallback question pool ──────────────────────────────────────────

const FALLBACK_RU: &[&str] = &[
    "Расскажи о проекте, которым ты гордишься больше всего. Какой была твоя роль?",
    "Как ты обычно принимаешь дизайнерские решения, когда данных не хватает?",
    "Опиши случай, когда твоё решение не сработало. Что ты сделал дальше?",
    "Как ты работаешь с обратной связью от продакт-менеджеров и разработчиков?",
    "Чем, по-твоему, отличается сильный дизайнер от среднего?",
];

const FALLBACK_EN: &[&str] = &[
    "Tell me about the project you're most proud of. What was your role?",
    "How do you make design decisions when you don't have enough data?",
    "Describe a time one of your design decisions failed. What did you do next?",
    "How do you work with feedback from product managers and engineers?",
    "In your view, what separates a strong designer from an average one?",
];

/// Backup question used when the generator tries to finish before the
/// minimum-answer floor. Indexed by how many answers the user has given,
/// clamped to the last entry.
pub fn fallback_question(lang: Lang, answer_count: usize) -> &'static str {
    let pool = match lang {
        Lang::Ru => FALLBACK_RU,
        Lang::En => FALLBACK_EN,
    };
    pool[answer_count.min(pool.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_mapping() {
        assert_eq!(Lang::from_code("ru"), Lang::Ru);
        assert_eq!(Lang::from_code("ru-RU"), Lang::Ru);
        assert_eq!(Lang::from_code("en"), Lang::En);
        assert_eq!(Lang::from_code("de"), Lang::En);
    }

    #[test]
    fn language_choice_parsing() {
        assert_eq!(Lang::parse_choice("Русский"), Some(Lang::Ru));
        assert_eq!(Lang::parse_choice(" english "), Some(Lang::En));
        assert_eq!(Lang::parse_choice("EN"), Some(Lang::En));
        assert_eq!(Lang::parse_choice("español"), None);
    }

    #[test]
    fn fallback_pool_clamps_to_last_entry() {
        assert_eq!(fallback_question(Lang::En, 0), FALLBACK_EN[0]);
        assert_eq!(fallback_question(Lang::En, 3), FALLBACK_EN[3]);
        assert_eq!(fallback_question(Lang::En, 100), FALLBACK_EN[4]);
        assert_eq!(fallback_question(Lang::Ru, 100), FALLBACK_RU[4]);
    }

    #[test]
    fn intro_handles_missing_name() {
        assert!(intro(Lang::En, "").contains("Hi, there!"));
        assert!(intro(Lang::Ru, "Аня").contains("Аня"));
    }
}
