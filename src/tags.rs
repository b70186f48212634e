//! Keyword tagging for lifelogs.

use crate::model::{EnrichedLifelog, Lifelog};

/// Vocabulary matched against lifelog text. Tag order follows this list.
pub const KEYWORDS: &[&str] = &[
    "meeting",
    "retailer",
    "support",
    "form",
    "demo",
    "onboarding",
    "call",
];

/// Case-insensitive substring match against [`KEYWORDS`].
///
/// Each keyword appears at most once, in vocabulary order.
pub fn generate_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    KEYWORDS
        .iter()
        .filter(|kw| lowered.contains(*kw))
        .map(|kw| kw.to_string())
        .collect()
}

/// Attach tags derived from the lifelog's body text.
pub fn enrich(lifelog: Lifelog) -> EnrichedLifelog {
    let tags = generate_tags(&lifelog.body_text());
    EnrichedLifelog { lifelog, tags }
}
