//! Answer modes and the retrieval intents a question can be routed to.

use serde::Serialize;
use std::fmt;

/// Answer shape requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Direct question answering.
    #[default]
    Qa,
    /// Whole-document summary.
    Summary,
    /// Short exam-oriented notes.
    ShortNotes,
    /// Detailed exam-ready notes.
    LongNotes,
    /// Bullet-point conversion.
    Bullets,
}

impl Mode {
    /// Parse a request label; anything unrecognized is `qa`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "summary" => Self::Summary,
            "short_notes" => Self::ShortNotes,
            "long_notes" => Self::LongNotes,
            "bullets" => Self::Bullets,
            _ => Self::Qa,
        }
    }

    /// Wire label of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qa => "qa",
            Self::Summary => "summary",
            Self::ShortNotes => "short_notes",
            Self::LongNotes => "long_notes",
            Self::Bullets => "bullets",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval strategy assigned to a question. Exactly one applies per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "mode", rename_all = "snake_case")]
pub enum QueryIntent {
    /// Guidance-seeking question; answered without retrieval.
    Meta,
    /// Exact reproduction of document text.
    Verbatim,
    /// Whole-document question or summary mode.
    GlobalSummary,
    /// Similarity search driven by the requested mode.
    Standard(Mode),
}

impl QueryIntent {
    /// Short label used in logs and responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Verbatim => "verbatim",
            Self::GlobalSummary => "global_summary",
            Self::Standard(_) => "standard",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(mode) => write!(f, "standard:{mode}"),
            other => f.write_str(other.label()),
        }
    }
}
