use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{
    domain::entities::moderation_verdict::{CategoryScores, FlagReason, ModerationVerdict},
    helper::error_chain_fmt,
    ports::content_classifier::{ContentClassifier, ContentClassifierError},
};

/// Above this the content is flagged as toxic
const TOXICITY_THRESHOLD: f32 = 0.7;
/// Above this the content gets a warning reason without being unsafe
const TOXICITY_WARNING_THRESHOLD: f32 = 0.5;
const CATEGORY_THRESHOLD: f32 = 0.5;
const SPAM_THRESHOLD: f32 = 0.6;
const SPAM_WARNING_THRESHOLD: f32 = 0.4;

const SPAM_KEYWORDS: &[&str] = &[
    "click here",
    "buy now",
    "limited offer",
    "act now",
    "free money",
    "earn $$$",
    "work from home",
    "weight loss",
    "viagra",
    "casino",
    "lottery",
    "prize winner",
];

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());

/// Screens free text for toxicity and spam.
///
/// Toxicity scoring is delegated to the injected `ContentClassifier`;
/// this service owns the threshold policy and the spam signals.
pub struct ContentModerator {
    classifier: Arc<dyn ContentClassifier>,
}

impl ContentModerator {
    pub fn new(classifier: Arc<dyn ContentClassifier>) -> Self {
        Self { classifier }
    }

    #[tracing::instrument(name = "Moderating content", skip(self, text))]
    pub async fn moderate(
        &self,
        text: &str,
        check_toxicity: bool,
        check_spam: bool,
    ) -> Result<ModerationVerdict, ModerationError> {
        let mut verdict = ModerationVerdict::safe_default();

        if check_toxicity {
            // Empty text short-circuits to all-zero scores without invoking the classifier
            let categories = if text.trim().is_empty() {
                CategoryScores::zeroed()
            } else {
                self.classifier.classify(text).await?
            };

            verdict.toxicity_score = categories.toxicity;
            verdict.categories = categories;

            if categories.toxicity >= TOXICITY_THRESHOLD {
                verdict.is_safe = false;
                verdict.flagged_reasons.push(FlagReason::HighToxicity);
            } else if categories.toxicity >= TOXICITY_WARNING_THRESHOLD {
                // A warning on its own does not mark the content unsafe
                verdict.flagged_reasons.push(FlagReason::ModerateToxicity);
            }

            if categories.severe_toxicity > CATEGORY_THRESHOLD {
                verdict.is_safe = false;
                verdict.flagged_reasons.push(FlagReason::SevereToxicity);
            }
            if categories.threat > CATEGORY_THRESHOLD {
                verdict.is_safe = false;
                verdict.flagged_reasons.push(FlagReason::Threat);
            }
            if categories.identity_attack > CATEGORY_THRESHOLD {
                verdict.is_safe = false;
                verdict.flagged_reasons.push(FlagReason::IdentityAttack);
            }
        }

        if check_spam {
            let (spam_score, matched_patterns) = check_spam_signals(text);
            verdict.spam_score = spam_score;

            if spam_score > SPAM_THRESHOLD {
                verdict.is_safe = false;
                verdict.flagged_reasons.push(FlagReason::Spam);
                verdict.spam_patterns = matched_patterns;
            } else if spam_score > SPAM_WARNING_THRESHOLD {
                verdict.flagged_reasons.push(FlagReason::PossibleSpam);
                verdict.spam_patterns = matched_patterns;
            }
        }

        debug!(?verdict.is_safe, ?verdict.flagged_reasons, "Moderation verdict");
        Ok(verdict)
    }
}

/// Counts spam signals and maps the count to a score with `min(1, n * 0.2)`
fn check_spam_signals(text: &str) -> (f32, Vec<String>) {
    if text.trim().is_empty() {
        return (0.0, Vec::new());
    }

    let text_lower = text.to_lowercase();
    let mut matched_patterns = Vec::new();

    for keyword in SPAM_KEYWORDS {
        if text_lower.contains(keyword) {
            matched_patterns.push(keyword.to_string());
        }
    }

    if URL_RE.find_iter(text).count() > 2 {
        matched_patterns.push("excessive_urls".to_string());
    }

    // Too short a text makes the capitalization ratio meaningless
    let char_count = text.chars().count();
    if char_count > 10 {
        let uppercase_count = text.chars().filter(|c| c.is_uppercase()).count();
        if uppercase_count as f32 / char_count as f32 > 0.5 {
            matched_patterns.push("excessive_caps".to_string());
        }
    }

    if text.matches('!').count() > 3 {
        matched_patterns.push("excessive_exclamation".to_string());
    }

    if has_repeated_run(text, 5) {
        matched_patterns.push("repeated_characters".to_string());
    }

    let spam_score = (matched_patterns.len() as f32 * 0.2).min(1.0);

    (spam_score, matched_patterns)
}

/// True when any run of identical consecutive characters reaches `min_run`
fn has_repeated_run(text: &str, min_run: usize) -> bool {
    let mut run = 0;
    let mut previous: Option<char> = None;

    for c in text.chars() {
        if Some(c) == previous {
            run += 1;
        } else {
            run = 1;
            previous = Some(c);
        }

        if run >= min_run {
            return true;
        }
    }

    false
}

#[derive(thiserror::Error)]
pub enum ModerationError {
    #[error(transparent)]
    ClassifierError(#[from] ContentClassifierError),
}

impl std::fmt::Debug for ModerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Classifier returning a fixed score sheet
    struct StubClassifier {
        scores: CategoryScores,
    }

    #[async_trait]
    impl ContentClassifier for StubClassifier {
        async fn classify(&self, _text: &str) -> Result<CategoryScores, ContentClassifierError> {
            Ok(self.scores)
        }
    }

    /// Classifier that must never be reached
    struct PanickingClassifier;

    #[async_trait]
    impl ContentClassifier for PanickingClassifier {
        async fn classify(&self, _text: &str) -> Result<CategoryScores, ContentClassifierError> {
            panic!("classifier must not be invoked for empty text");
        }
    }

    /// Classifier whose backend is down
    struct FailingClassifier;

    #[async_trait]
    impl ContentClassifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Result<CategoryScores, ContentClassifierError> {
            Err(ContentClassifierError::Unavailable("backend down".into()))
        }
    }

    fn moderator_scoring(toxicity: f32) -> ContentModerator {
        ContentModerator::new(Arc::new(StubClassifier {
            scores: CategoryScores {
                toxicity,
                ..CategoryScores::zeroed()
            },
        }))
    }

    #[tokio::test]
    async fn toxicity_at_exactly_the_threshold_is_flagged_high_and_unsafe() {
        let verdict = moderator_scoring(0.7)
            .moderate("some text", true, false)
            .await
            .unwrap();

        assert!(!verdict.is_safe);
        assert_eq!(verdict.flagged_reasons, vec![FlagReason::HighToxicity]);
    }

    #[tokio::test]
    async fn moderate_toxicity_warns_but_stays_safe() {
        let verdict = moderator_scoring(0.55)
            .moderate("some text", true, false)
            .await
            .unwrap();

        assert!(verdict.is_safe);
        assert_eq!(verdict.flagged_reasons, vec![FlagReason::ModerateToxicity]);
    }

    #[tokio::test]
    async fn category_scores_above_half_each_append_their_own_reason() {
        let moderator = ContentModerator::new(Arc::new(StubClassifier {
            scores: CategoryScores {
                toxicity: 0.9,
                severe_toxicity: 0.6,
                threat: 0.6,
                identity_attack: 0.6,
                ..CategoryScores::zeroed()
            },
        }));

        let verdict = moderator.moderate("some text", true, false).await.unwrap();

        assert!(!verdict.is_safe);
        assert_eq!(
            verdict.flagged_reasons,
            vec![
                FlagReason::HighToxicity,
                FlagReason::SevereToxicity,
                FlagReason::Threat,
                FlagReason::IdentityAttack,
            ]
        );
    }

    #[tokio::test]
    async fn empty_text_short_circuits_without_invoking_the_classifier() {
        let moderator = ContentModerator::new(Arc::new(PanickingClassifier));

        let verdict = moderator.moderate("   ", true, true).await.unwrap();

        assert!(verdict.is_safe);
        assert_eq!(verdict.toxicity_score, 0.0);
        assert_eq!(verdict.spam_score, 0.0);
        assert!(verdict.flagged_reasons.is_empty());
    }

    #[tokio::test]
    async fn an_unavailable_classifier_is_an_error_never_a_safe_verdict() {
        let moderator = ContentModerator::new(Arc::new(FailingClassifier));

        let result = moderator.moderate("some text", true, false).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn three_spam_keywords_land_exactly_on_the_possible_spam_boundary() {
        let moderator = moderator_scoring(0.0);

        // Three keyword matches and no other signal: score = 3 * 0.2 = 0.6,
        // which is `possible_spam`, not `spam` (the spam boundary is strict)
        let verdict = moderator
            .moderate("click here to buy now, you prize winner", true, true)
            .await
            .unwrap();

        assert_eq!(verdict.spam_score, 0.6);
        assert!(verdict.is_safe);
        assert_eq!(verdict.flagged_reasons, vec![FlagReason::PossibleSpam]);
        assert_eq!(
            verdict.spam_patterns,
            vec!["click here", "buy now", "prize winner"]
        );
    }

    #[tokio::test]
    async fn four_spam_signals_cross_the_spam_threshold() {
        let moderator = moderator_scoring(0.0);

        let verdict = moderator
            .moderate(
                "click here!!!! buy now from the casino wheeeeeee",
                true,
                true,
            )
            .await
            .unwrap();

        // keywords (click here, buy now, casino) + exclamations + repeated run
        assert!(verdict.spam_score > 0.6);
        assert!(!verdict.is_safe);
        assert_eq!(verdict.flagged_reasons, vec![FlagReason::Spam]);
    }

    #[tokio::test]
    async fn toxicity_reasons_come_before_spam_reasons() {
        let moderator = moderator_scoring(0.8);

        let verdict = moderator
            .moderate(
                "click here!!!! buy now from the casino wheeeeeee",
                true,
                true,
            )
            .await
            .unwrap();

        assert_eq!(
            verdict.flagged_reasons,
            vec![FlagReason::HighToxicity, FlagReason::Spam]
        );
    }

    #[test]
    fn excessive_caps_only_counts_on_texts_longer_than_ten_chars() {
        let (short_score, short_patterns) = check_spam_signals("HELLO YOU");
        assert_eq!(short_score, 0.0);
        assert!(short_patterns.is_empty());

        let (_, long_patterns) = check_spam_signals("HELLO YOU ALL THERE");
        assert_eq!(long_patterns, vec!["excessive_caps"]);
    }

    #[test]
    fn url_signal_requires_more_than_two_urls() {
        let (_, patterns) =
            check_spam_signals("see http://a.example http://b.example http://c.example");
        assert_eq!(patterns, vec!["excessive_urls"]);

        let (_, patterns) = check_spam_signals("see http://a.example http://b.example");
        assert!(patterns.is_empty());
    }
}
