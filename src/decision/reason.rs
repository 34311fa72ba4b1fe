use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a funding request was declined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclineReason {
    #[default]
    None,
    InvalidTransactionType,
    CardExpired,
    InvalidCardStatus,
    AmountMismatch,
    AmountTooHigh,
    PreviouslyAuthorized,
    LeaseAlreadyFunded,
    StateMissing,
    StateMismatch,
}

impl DeclineReason {
    /// Human readable sentence returned to the network alongside the decision.
    pub fn message(&self) -> &'static str {
        match self {
            DeclineReason::None => "Transaction approved.",
            DeclineReason::InvalidTransactionType => {
                "Transaction type is not an authorization."
            }
            DeclineReason::CardExpired => "Card is past its active-to date.",
            DeclineReason::InvalidCardStatus => "Card is not in a fundable status.",
            DeclineReason::AmountMismatch => {
                "Transaction amount is outside the allowed range for this card."
            }
            DeclineReason::AmountTooHigh => "Transaction amount exceeds the available balance.",
            DeclineReason::PreviouslyAuthorized => {
                "Card has already been authorized for its minimum amount."
            }
            DeclineReason::LeaseAlreadyFunded => "Lease has already been funded.",
            DeclineReason::StateMissing => "Transaction or store state is missing.",
            DeclineReason::StateMismatch => {
                "Transaction state does not match the store state."
            }
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reason_has_a_distinct_message() {
        let reasons = [
            DeclineReason::None,
            DeclineReason::InvalidTransactionType,
            DeclineReason::CardExpired,
            DeclineReason::InvalidCardStatus,
            DeclineReason::AmountMismatch,
            DeclineReason::AmountTooHigh,
            DeclineReason::PreviouslyAuthorized,
            DeclineReason::LeaseAlreadyFunded,
            DeclineReason::StateMissing,
            DeclineReason::StateMismatch,
        ];
        let messages: std::collections::HashSet<_> =
            reasons.iter().map(DeclineReason::message).collect();
        assert_eq!(messages.len(), reasons.len());
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&DeclineReason::LeaseAlreadyFunded).unwrap();
        assert_eq!(json, "\"LEASE_ALREADY_FUNDED\"");
    }
}
