//! Refactor signal - decides from Verifier blockers whether a refactor is warranted
//!
//! This is a fuzzy classifier. The keyword list is incomplete on purpose and
//! lives in configuration; callers can swap in their own predicate.

use crate::report::Blocker;

/// Default vocabulary of refactor-indicating terms
pub const DEFAULT_REFACTOR_KEYWORDS: &[&str] = &[
    "refactor",
    "layering",
    "layer",
    "duplication",
    "duplicate",
    "complexity",
    "complex",
    "coupling",
    "cohesion",
    "performance",
    "testability",
    "maintainability",
    "architecture",
    "modular",
    "separation of concerns",
    "dead code",
];

/// Predicate over a batch of blockers
pub trait RefactorSignal: Send + Sync {
    fn recommends_refactor(&self, blockers: &[Blocker]) -> bool;
}

/// Case-insensitive substring match against a keyword list
#[derive(Debug, Clone)]
pub struct KeywordSignal {
    keywords: Vec<String>,
}

impl KeywordSignal {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword found in the blockers, if any
    pub fn matching_keyword(&self, blockers: &[Blocker]) -> Option<&str> {
        let haystack = blockers
            .iter()
            .map(|b| format!("{} {} {}", b.ids.join(" "), b.summary, b.fix))
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase();

        self.keywords
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(|keyword| keyword.as_str())
    }
}

impl Default for KeywordSignal {
    fn default() -> Self {
        Self::new(DEFAULT_REFACTOR_KEYWORDS)
    }
}

impl RefactorSignal for KeywordSignal {
    fn recommends_refactor(&self, blockers: &[Blocker]) -> bool {
        self.matching_keyword(blockers).is_some()
    }
}
