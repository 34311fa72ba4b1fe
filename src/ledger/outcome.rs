use std::fmt;

use super::CardSnapshot;

/// Result of applying an authorization to a card.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    /// The authorization was recorded. Holds the card as persisted, or as
    /// read when the authorization was declined and nothing changed.
    Applied(CardSnapshot),
    /// An expected race was absorbed and the card left untouched.
    SoftFail(SoftFail),
}

impl LedgerOutcome {
    pub fn card(&self) -> Option<&CardSnapshot> {
        match self {
            LedgerOutcome::Applied(card) => Some(card),
            LedgerOutcome::SoftFail(_) => None,
        }
    }

    pub fn is_soft_fail(&self) -> bool {
        matches!(self, LedgerOutcome::SoftFail(_))
    }
}

/// Why an authorization was absorbed without touching the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftFail {
    /// The (reference id, network auth id) pair was already recorded.
    DuplicateAuthorization,
    /// No card carries the authorization's reference id.
    CardNotFound,
}

impl fmt::Display for SoftFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftFail::DuplicateAuthorization => write!(f, "authorization already recorded"),
            SoftFail::CardNotFound => write!(f, "card not found"),
        }
    }
}
