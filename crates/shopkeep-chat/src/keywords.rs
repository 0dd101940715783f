//! Product keyword extraction from free text.

use std::sync::LazyLock;

use regex::Regex;

/// Product-domain nouns recognised as search terms.
const PRODUCT_VOCABULARY: &[&str] = &[
    "laptop",
    "computer",
    "smartphone",
    "phone",
    "tablet",
    "headphone",
    "speaker",
    "book",
    "novel",
    "textbook",
    "ebook",
    "shirt",
    "jeans",
    "dress",
    "shoes",
    "camera",
    "watch",
    "keyboard",
    "mouse",
    "monitor",
    "tv",
    "television",
    "electronics",
    "sports",
    "fitness",
    "home",
    "garden",
    "kitchen",
    "furniture",
];

/// Raw tokens returned when no vocabulary term is present.
const FALLBACK_TOKENS: usize = 3;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("Invalid word regex"));

/// Pulls candidate product-search terms out of a message.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Vocabulary terms in order of first appearance, or the first three
    /// lower-cased tokens when none match.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut found: Vec<String> = Vec::new();
        for token in &tokens {
            if let Some(term) = vocabulary_term(token) {
                if !found.iter().any(|f| f == term) {
                    found.push(term.to_string());
                }
            }
        }

        if found.is_empty() {
            return tokens
                .iter()
                .take(FALLBACK_TOKENS)
                .map(|t| t.to_string())
                .collect();
        }
        found
    }
}

/// Map a token to its vocabulary entry, accepting simple `-s`/`-es` plurals
/// and the singular of entries stored in plural form (`shoe` -> `shoes`).
fn vocabulary_term(token: &str) -> Option<&'static str> {
    let lookup = |candidate: &str| PRODUCT_VOCABULARY.iter().copied().find(|v| *v == candidate);

    lookup(token)
        .or_else(|| token.strip_suffix('s').and_then(lookup))
        .or_else(|| token.strip_suffix("es").and_then(lookup))
        .or_else(|| lookup(&format!("{}s", token)))
}
