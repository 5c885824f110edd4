//! Question intent classification.
//!
//! Classification walks an ordered rule list; the first rule whose patterns match and whose
//! vetoes do not wins. Matching is case-insensitive substring containment, not tokens, so
//! "exactly" also matches the `exact` pattern. When no rule fires, `summary` mode still routes
//! to a whole-document read and every other mode falls through to similarity search.

use super::intent::{Mode, QueryIntent};

/// Category a rule assigns when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    /// Guidance-seeking question.
    Meta,
    /// Exact reproduction request.
    Verbatim,
    /// Whole-document request.
    GlobalSummary,
}

impl RuleCategory {
    fn intent(self) -> QueryIntent {
        match self {
            Self::Meta => QueryIntent::Meta,
            Self::Verbatim => QueryIntent::Verbatim,
            Self::GlobalSummary => QueryIntent::GlobalSummary,
        }
    }
}

/// One `(patterns, category, vetoes)` entry of the rule list.
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    category: RuleCategory,
    patterns: Vec<String>,
    vetoes: Vec<String>,
}

impl ClassificationRule {
    /// Build a rule; phrases are lowercased once here.
    pub fn new<P, V>(category: RuleCategory, patterns: P, vetoes: V) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
    {
        Self {
            category,
            patterns: lowercase_all(patterns),
            vetoes: lowercase_all(vetoes),
        }
    }

    /// Category assigned when the rule fires.
    pub fn category(&self) -> RuleCategory {
        self.category
    }

    /// Whether the rule fires for an already-lowercased question.
    pub fn matches(&self, lowered_question: &str) -> bool {
        contains_any(lowered_question, &self.patterns) && !contains_any(lowered_question, &self.vetoes)
    }
}

/// Guidance phrases that mark a question as meta.
pub const META_PHRASES: &[&str] = &[
    "help me understand",
    "explain this paper",
    "walk me through",
    "go through this paper",
    "can you help me",
];

/// Factual phrases that veto the meta category.
pub const FACTUAL_PHRASES: &[&str] = &[
    "how many",
    "how much",
    "how many parts",
    "how many sections",
    "which part",
    "which section",
    "total marks",
    "maximum marks",
    "number of questions",
    "how many questions",
];

/// Phrases asking for exact reproduction.
pub const VERBATIM_PHRASES: &[&str] = &[
    "exact",
    "exact content",
    "exact text",
    "word by word",
    "verbatim",
    "exactly as written",
    "what is written",
    "entire page",
    "full page",
    "candidate declaration",
    "declaration page",
];

/// Phrases asking about the whole document.
pub const GLOBAL_PHRASES: &[&str] = &[
    "whole pdf",
    "entire pdf",
    "whole document",
    "entire document",
    "all subjects",
    "list all",
    "complete list",
    "total subjects",
];

const NO_VETOES: &[&str] = &[];

/// Deterministic, total mapping from `(question, mode)` to a [`QueryIntent`].
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    rules: Vec<ClassificationRule>,
}

impl QueryClassifier {
    /// Build a classifier from an ordered rule list.
    pub fn new(rules: Vec<ClassificationRule>) -> Self {
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Classify a question. First matching rule wins; otherwise the mode decides.
    pub fn classify(&self, question: &str, mode: Mode) -> QueryIntent {
        let lowered = question.to_lowercase();
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&lowered)) {
            return rule.category.intent();
        }
        match mode {
            Mode::Summary => QueryIntent::GlobalSummary,
            other => QueryIntent::Standard(other),
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new(vec![
            ClassificationRule::new(RuleCategory::Meta, META_PHRASES, FACTUAL_PHRASES),
            ClassificationRule::new(RuleCategory::Verbatim, VERBATIM_PHRASES, NO_VETOES),
            ClassificationRule::new(RuleCategory::GlobalSummary, GLOBAL_PHRASES, NO_VETOES),
        ])
    }
}

fn lowercase_all<I>(phrases: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    phrases
        .into_iter()
        .map(|phrase| phrase.as_ref().to_lowercase())
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
