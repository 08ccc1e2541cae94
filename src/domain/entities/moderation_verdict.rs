use serde::{Deserialize, Serialize};

/// Scores over the fixed six-category toxicity taxonomy, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct CategoryScores {
    pub toxicity: f32,
    pub severe_toxicity: f32,
    pub obscene: f32,
    pub threat: f32,
    pub insult: f32,
    pub identity_attack: f32,
}

impl CategoryScores {
    pub fn zeroed() -> Self {
        Self {
            toxicity: 0.0,
            severe_toxicity: 0.0,
            obscene: 0.0,
            threat: 0.0,
            insult: 0.0,
            identity_attack: 0.0,
        }
    }
}

/// Reason codes attached to a verdict, in the order they were evaluated:
/// toxicity reasons before spam reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    HighToxicity,
    ModerateToxicity,
    SevereToxicity,
    Threat,
    IdentityAttack,
    Spam,
    PossibleSpam,
}

/// Outcome of moderating one text blob. Computed fresh per request,
/// never persisted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModerationVerdict {
    pub is_safe: bool,
    pub toxicity_score: f32,
    pub spam_score: f32,
    pub categories: CategoryScores,
    pub flagged_reasons: Vec<FlagReason>,
    /// Spam signals that matched, empty when no spam reason was raised
    pub spam_patterns: Vec<String>,
}

impl ModerationVerdict {
    pub fn safe_default() -> Self {
        Self {
            is_safe: true,
            toxicity_score: 0.0,
            spam_score: 0.0,
            categories: CategoryScores::zeroed(),
            flagged_reasons: Vec::new(),
            spam_patterns: Vec::new(),
        }
    }
}
