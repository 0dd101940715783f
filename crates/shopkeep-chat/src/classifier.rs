//! Rule-based intent classification.
//!
//! Intents are tested in the order of [`INTENT_PATTERNS`]; the first intent
//! with any matching pattern wins and unmatched text is [`Intent::General`].

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Intent;

/// Ordered (intent, patterns) table. Earlier rows take priority.
pub const INTENT_PATTERNS: &[(Intent, &[&str])] = &[
    (
        Intent::Greeting,
        &[
            r"\b(hi|hello|hey|good morning|good afternoon|good evening)\b",
            r"\bwhat's up\b",
            r"\bhow are you\b",
        ],
    ),
    (
        Intent::SearchProduct,
        &[
            r"\b(looking for|search|find|want|need|show me)\b.*\b(product|item|thing)\b",
            r"\b(do you have|got any|sell)\b",
            r"\b(price of|cost of|how much)\b",
        ],
    ),
    (
        Intent::CategoryBrowse,
        &[
            r"\b(category|categories|section|browse|explore)\b",
            r"\b(electronics|books|clothing|home|garden|sports)\b",
        ],
    ),
    (
        Intent::ProductDetails,
        &[
            r"\b(details|specifications|specs|features|info|information)\b",
            r"\btell me (more )?about\b",
            r"\bwhat is\b",
        ],
    ),
    (
        Intent::AddToCart,
        &[
            r"\b(add to cart|buy|purchase|order|get this)\b",
            r"\bi want (to buy|this)\b",
        ],
    ),
    (
        Intent::Help,
        &[
            r"\b(help|assist|support|guide)\b",
            r"\bwhat can you do\b",
            r"\bhow does this work\b",
        ],
    ),
    (
        Intent::Goodbye,
        &[
            r"\b(bye|goodbye|see you|thanks|thank you)\b",
            r"\bthat's all\b",
            r"\bi'm done\b",
        ],
    ),
];

static COMPILED_PATTERNS: LazyLock<Vec<(Intent, Vec<Regex>)>> = LazyLock::new(|| {
    INTENT_PATTERNS
        .iter()
        .map(|(intent, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){}", p)).expect("Invalid intent regex"))
                .collect();
            (*intent, compiled)
        })
        .collect()
});

/// Maps raw message text to exactly one [`Intent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, text: &str) -> Intent {
        COMPILED_PATTERNS
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::General)
    }

    /// Every intent whose patterns match, in priority order.
    pub fn matching_intents(&self, text: &str) -> Vec<Intent> {
        COMPILED_PATTERNS
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(intent, _)| *intent)
            .collect()
    }

    /// Declared evaluation order.
    pub fn priority(&self) -> Vec<Intent> {
        INTENT_PATTERNS.iter().map(|(intent, _)| *intent).collect()
    }
}
