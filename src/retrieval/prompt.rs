//! Prompt templates and answer post-processing.

use super::intent::{Mode, QueryIntent};
use serde::Serialize;
use std::fmt;

/// Answer returned when no context reaches the prompt.
pub const NO_RELEVANT_INFORMATION: &str =
    "Is document mein is question se related information nahi hai.";

/// Prefix added to generated verbatim answers.
pub const VERBATIM_DISCLAIMER: &str = "⚠ NOTE: Text reproduced directly from PDF.\n\n";

/// Language the answer should be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Plain English.
    #[default]
    English,
    /// Conversational Hindi.
    Hindi,
    /// Hindi and English mixed.
    Hinglish,
}

impl Language {
    /// Parse a request label; anything unrecognized is `english`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "hindi" => Self::Hindi,
            "hinglish" => Self::Hinglish,
            _ => Self::English,
        }
    }

    /// Wire label of the language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Hinglish => "hinglish",
        }
    }

    /// Instruction inserted into every non-meta template.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::English => "Explain in clear, concise English.\nExam-appropriate tone.",
            Self::Hindi => "Explain in simple conversational Hindi.\nSuitable for college exams.",
            Self::Hinglish => {
                "Use natural Hinglish (Hindi + English mix).\nFriendly, clear, knowledgeable tone."
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template family chosen for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Offer options instead of answering.
    MetaGuidance,
    /// Reproduce document text as-is.
    Verbatim,
    /// Summarize the whole content.
    Summary,
    /// Short notes.
    ShortNotes,
    /// Detailed notes.
    LongNotes,
    /// Bullet points.
    Bullets,
    /// Answer from the context.
    Qa,
}

/// Turns routing decisions and context into the prompt sent to the generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Template for `intent`; intent decides first, then the requested mode.
    pub fn template_for(intent: QueryIntent, mode: Mode) -> PromptTemplate {
        match intent {
            QueryIntent::Meta => PromptTemplate::MetaGuidance,
            QueryIntent::Verbatim => PromptTemplate::Verbatim,
            QueryIntent::GlobalSummary | QueryIntent::Standard(_) => match mode {
                Mode::Summary => PromptTemplate::Summary,
                Mode::ShortNotes => PromptTemplate::ShortNotes,
                Mode::LongNotes => PromptTemplate::LongNotes,
                Mode::Bullets => PromptTemplate::Bullets,
                Mode::Qa => PromptTemplate::Qa,
            },
        }
    }

    /// Render the full prompt.
    pub fn build(
        intent: QueryIntent,
        mode: Mode,
        language: Language,
        context: &str,
        question: &str,
    ) -> String {
        let instruction = language.instruction();
        match Self::template_for(intent, mode) {
            PromptTemplate::MetaGuidance => format!(
                "The user is asking for guidance, not direct answers.\n\n\
                 Rules:\n\
                 - Do NOT dump all questions\n\
                 - Do NOT repeat content\n\
                 - Offer 2–3 clear options\n\
                 - Ask the user to choose ONE option\n\
                 - STOP after that\n\n\
                 User question:\n{question}\n"
            ),
            PromptTemplate::Verbatim => format!(
                "Reproduce the following document text EXACTLY as it appears.\n\
                 Do not paraphrase, summarize or reorder it.\n\n\
                 {instruction}\n\n\
                 Document Content:\n{context}\n\n\
                 Question:\n{question}\n"
            ),
            PromptTemplate::Summary => format!(
                "Summarize the document using ONLY the provided content.\n\n\
                 {instruction}\n\n\
                 Content:\n{context}\n"
            ),
            PromptTemplate::ShortNotes => format!(
                "Create short exam-oriented notes.\n\n\
                 {instruction}\n\n\
                 Content:\n{context}\n"
            ),
            PromptTemplate::LongNotes => format!(
                "Create detailed exam-ready notes.\n\n\
                 {instruction}\n\n\
                 Content:\n{context}\n"
            ),
            PromptTemplate::Bullets => format!(
                "Convert the content into clean bullet points.\n\n\
                 {instruction}\n\n\
                 Content:\n{context}\n"
            ),
            PromptTemplate::Qa => format!(
                "Answer the question using ONLY the document content.\n\n\
                 {instruction}\n\n\
                 Context:\n{context}\n\n\
                 Question:\n{question}\n"
            ),
        }
    }
}

/// Post-process a generated answer; verbatim answers get [`VERBATIM_DISCLAIMER`].
pub fn annotate_answer(intent: QueryIntent, answer: &str) -> String {
    let answer = answer.trim();
    match intent {
        QueryIntent::Verbatim => format!("{VERBATIM_DISCLAIMER}{answer}"),
        _ => answer.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_labels_fall_back_to_english() {
        assert_eq!(Language::from_label("Hinglish"), Language::Hinglish);
        assert_eq!(Language::from_label("hindi "), Language::Hindi);
        assert_eq!(Language::from_label("french"), Language::English);
    }

    #[test]
    fn template_table_is_total() {
        use PromptTemplate as T;
        assert_eq!(PromptBuilder::template_for(QueryIntent::Meta, Mode::Summary), T::MetaGuidance);
        assert_eq!(PromptBuilder::template_for(QueryIntent::Verbatim, Mode::Bullets), T::Verbatim);
        assert_eq!(PromptBuilder::template_for(QueryIntent::GlobalSummary, Mode::Qa), T::Qa);
        assert_eq!(
            PromptBuilder::template_for(QueryIntent::GlobalSummary, Mode::Summary),
            T::Summary
        );
        assert_eq!(
            PromptBuilder::template_for(QueryIntent::Standard(Mode::LongNotes), Mode::LongNotes),
            T::LongNotes
        );
    }

    #[test]
    fn meta_prompt_has_no_context_or_language_instruction() {
        let prompt = PromptBuilder::build(
            QueryIntent::Meta,
            Mode::Qa,
            Language::Hindi,
            "SECRET CONTEXT",
            "help me understand this paper",
        );
        assert!(prompt.contains("Offer 2–3 clear options"));
        assert!(prompt.contains("help me understand this paper"));
        assert!(!prompt.contains("SECRET CONTEXT"));
        assert!(!prompt.contains(Language::Hindi.instruction()));
    }

    #[test]
    fn verbatim_prompt_carries_context_and_language() {
        let prompt = PromptBuilder::build(
            QueryIntent::Verbatim,
            Mode::Qa,
            Language::Hinglish,
            "I hereby declare",
            "exact text of declaration page",
        );
        assert!(prompt.starts_with("Reproduce the following document text EXACTLY"));
        assert!(prompt.contains("I hereby declare"));
        assert!(prompt.contains(Language::Hinglish.instruction()));
    }

    #[test]
    fn mode_templates_insert_language_instruction() {
        for mode in [Mode::Summary, Mode::ShortNotes, Mode::LongNotes, Mode::Bullets, Mode::Qa] {
            let prompt = PromptBuilder::build(
                QueryIntent::Standard(mode),
                mode,
                Language::English,
                "ctx",
                "q",
            );
            assert!(prompt.contains(Language::English.instruction()), "{mode}");
            assert!(prompt.contains("ctx"), "{mode}");
        }
    }

    #[test]
    fn only_verbatim_answers_get_the_disclaimer() {
        assert_eq!(
            annotate_answer(QueryIntent::Verbatim, " text \n"),
            format!("{VERBATIM_DISCLAIMER}text")
        );
        assert_eq!(
            annotate_answer(QueryIntent::Standard(Mode::Qa), "answer"),
            "answer"
        );
    }
}
