//! Question classification

use crate::error::{BuddyError, BuddyResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Programming vocabulary marking a question as technical
static TECHNICAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(code|coding|programming|python|javascript|typescript|rust|react|api|database|sql|html|css|debug|error|function|algorithm|framework|library|compiler)\b",
    )
    .unwrap()
});

/// Definition-style phrasing that wants a one or two sentence answer
static QUICK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what is|what are|define|meaning of|difference between)\b").unwrap()
});

/// System prompt flavour used for a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    Quick,
    Technical,
    General,
}

impl PromptStyle {
    /// System instruction for this style
    pub fn system_prompt(&self) -> &'static str {
        match self {
            PromptStyle::Quick => "Provide a brief, direct answer in 1-2 sentences.",
            PromptStyle::Technical => {
                "You are a fast technical assistant. Provide concise, accurate code examples \
                 and explanations. Keep responses under 400 words unless specifically asked \
                 for more detail."
            }
            PromptStyle::General => {
                "You are a helpful assistant. Provide clear, concise answers. Keep responses \
                 under 300 words unless specifically asked for more detail."
            }
        }
    }
}

/// Pluggable technical/general heuristic
pub trait QuestionClassifier: Send + Sync {
    /// Whether the question is about programming or technology
    fn is_technical(&self, question: &str) -> bool;

    /// Prompt style to answer with
    fn prompt_style(&self, question: &str) -> PromptStyle {
        if self.is_technical(question) {
            PromptStyle::Technical
        } else {
            PromptStyle::General
        }
    }
}

/// Keyword-based classifier
///
/// Definition-style questions get the quick style even when technical;
/// `is_technical` only looks at the vocabulary.
pub struct KeywordClassifier {
    technical: Regex,
    quick: Regex,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            technical: TECHNICAL_PATTERN.clone(),
            quick: QUICK_PATTERN.clone(),
        }
    }
}

impl KeywordClassifier {
    /// Classifier with a custom technical vocabulary
    pub fn with_keywords<I, S>(keywords: I) -> BuddyResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = keywords
            .into_iter()
            .map(|k| regex::escape(k.as_ref().trim()))
            .filter(|k| !k.is_empty())
            .collect();
        if alternatives.is_empty() {
            return Err(BuddyError::invalid_input("keyword list is empty"));
        }

        let technical = Regex::new(&format!(r"(?i)\b({})\b", alternatives.join("|")))
            .map_err(|e| BuddyError::invalid_input(format!("invalid keyword: {}", e)))?;
        Ok(Self {
            technical,
            quick: QUICK_PATTERN.clone(),
        })
    }
}

impl QuestionClassifier for KeywordClassifier {
    fn is_technical(&self, question: &str) -> bool {
        self.technical.is_match(question)
    }

    fn prompt_style(&self, question: &str) -> PromptStyle {
        if self.quick.is_match(question) {
            PromptStyle::Quick
        } else if self.is_technical(question) {
            PromptStyle::Technical
        } else {
            PromptStyle::General
        }
    }
}
