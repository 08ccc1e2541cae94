use async_trait::async_trait;

use crate::{
    domain::entities::moderation_verdict::CategoryScores,
    ports::content_classifier::{ContentClassifier, ContentClassifierError},
};

const TOXIC_WORDS: &[&str] = &[
    "stupid", "idiot", "dumb", "hate", "kill", "die", "ugly", "loser", "moron", "shut up", "fuck",
    "shit", "bitch", "ass", "damn", "hell", "crap", "suck", "worst",
];

const SEVERE_TOXIC_WORDS: &[&str] = &[
    "kill yourself",
    "die",
    "kys",
    "suicide",
    "murder",
    "terrorist",
    "bomb",
    "attack",
];

const INSULT_WORDS: &[&str] = &["stupid", "idiot", "dumb", "moron", "loser"];
const THREAT_WORDS: &[&str] = &["kill", "die", "murder", "attack"];
const OBSCENE_WORDS: &[&str] = &["fuck", "shit", "bitch", "ass"];

/// Rule-based `ContentClassifier`: word-list matching, no model.
///
/// A lightweight drop-in for the zero-shot backend when no model can be
/// loaded; both produce the same six-category shape.
pub struct KeywordContentClassifier;

impl KeywordContentClassifier {
    pub fn new() -> Self {
        Self
    }

    fn score(text: &str) -> CategoryScores {
        if text.trim().is_empty() {
            return CategoryScores::zeroed();
        }

        let text_lower = text.to_lowercase();
        let contains = |word: &&str| text_lower.contains(*word);

        let toxic_count = TOXIC_WORDS.iter().filter(|w| contains(w)).count();
        let severe_count = SEVERE_TOXIC_WORDS.iter().filter(|w| contains(w)).count();

        let toxicity = (toxic_count as f32 * 0.3).min(1.0);
        let severe_toxicity = (severe_count as f32 * 0.5).min(1.0);

        let insult = if INSULT_WORDS.iter().any(|w| contains(w)) {
            0.7
        } else {
            0.0
        };
        let threat = if THREAT_WORDS.iter().any(|w| contains(w)) {
            0.8
        } else {
            0.0
        };
        let obscene = if OBSCENE_WORDS.iter().any(|w| contains(w)) {
            0.6
        } else {
            0.0
        };

        // Overall toxicity is the max over all categories
        let overall = [toxicity, severe_toxicity, insult, threat, obscene]
            .into_iter()
            .fold(0.0_f32, f32::max);

        CategoryScores {
            toxicity: overall,
            severe_toxicity,
            obscene,
            threat,
            insult,
            // Would need a model-based backend to detect
            identity_attack: 0.0,
        }
    }
}

impl Default for KeywordContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentClassifier for KeywordContentClassifier {
    async fn classify(&self, text: &str) -> Result<CategoryScores, ContentClassifierError> {
        Ok(Self::score(text))
    }
}
