//! The funding rules, each a pure check of a request against a card.

use crate::ledger::{CardSnapshot, CardStatus};
use crate::model::{AUTHORIZATION_TYPE, FUNDED_LEASE_STATUS, FundingRequest};

use super::{Decision, DeclineReason};

/// A single approval rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    TransactionType,
    ActiveToDate,
    CardStatus,
    AvailableBalance,
    Funded,
    State,
}

impl Rule {
    /// Evaluation order. Overlapping violations report the earliest rule.
    pub const ORDER: [Rule; 6] = [
        Rule::TransactionType,
        Rule::ActiveToDate,
        Rule::CardStatus,
        Rule::AvailableBalance,
        Rule::Funded,
        Rule::State,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rule::TransactionType => "transaction_type",
            Rule::ActiveToDate => "active_to_date",
            Rule::CardStatus => "card_status",
            Rule::AvailableBalance => "available_balance",
            Rule::Funded => "funded",
            Rule::State => "state",
        }
    }

    pub fn evaluate(&self, request: &FundingRequest, card: &CardSnapshot) -> Decision {
        match self {
            Rule::TransactionType => transaction_type(request),
            Rule::ActiveToDate => active_to_date(request, card),
            Rule::CardStatus => card_status(card),
            Rule::AvailableBalance => available_balance(request, card),
            Rule::Funded => funded(request, card),
            Rule::State => state(request),
        }
    }
}

fn transaction_type(request: &FundingRequest) -> Decision {
    if request.transaction_type == AUTHORIZATION_TYPE {
        Decision::approve()
    } else {
        Decision::decline(DeclineReason::InvalidTransactionType)
    }
}

fn active_to_date(request: &FundingRequest, card: &CardSnapshot) -> Decision {
    if request.transaction_date > card.active_to_date {
        Decision::decline(DeclineReason::CardExpired)
    } else {
        Decision::approve()
    }
}

fn card_status(card: &CardSnapshot) -> Decision {
    if card.status.is_fundable() {
        Decision::approve()
    } else {
        Decision::decline(DeclineReason::InvalidCardStatus)
    }
}

/// Card status is validated by the preceding rule.
///
/// Minimum-amount cards are funded once, for an amount within
/// `[base - max_amount_less, base]`. Other cards only need enough available
/// balance.
fn available_balance(request: &FundingRequest, card: &CardSnapshot) -> Decision {
    let amount = request.transaction_amount;

    if request.is_min_amount_required {
        if card.status == CardStatus::Authorized {
            return Decision::decline(DeclineReason::PreviouslyAuthorized);
        }

        let high = card.original_card_base_amount;
        let low = high - card.max_amount_less;
        if low <= amount && amount <= high {
            Decision::approve()
        } else {
            Decision::decline(DeclineReason::AmountMismatch)
        }
    } else if amount > card.available_balance {
        Decision::decline(DeclineReason::AmountTooHigh)
    } else {
        Decision::approve()
    }
}

fn funded(request: &FundingRequest, card: &CardSnapshot) -> Decision {
    if request.lease_status == FUNDED_LEASE_STATUS
        && request.is_min_amount_required
        && card.status == CardStatus::Authorized
    {
        Decision::decline(DeclineReason::LeaseAlreadyFunded)
    } else {
        Decision::approve()
    }
}

/// Whitespace-only states count as missing; present states must match exactly.
fn state(request: &FundingRequest) -> Decision {
    if !request.use_state_validation {
        return Decision::approve();
    }

    let transaction_state = request.transaction_state.as_str();
    let store_state = request.store_address_state.as_str();
    if transaction_state.trim().is_empty() || store_state.trim().is_empty() {
        Decision::decline(DeclineReason::StateMissing)
    } else if transaction_state != store_state {
        Decision::decline(DeclineReason::StateMismatch)
    } else {
        Decision::approve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Amount;
    use crate::decision::tests::request;
    use crate::ledger::state::tests::card;
    use chrono::Duration;

    fn reason(rule: Rule, request: &FundingRequest, card: &CardSnapshot) -> DeclineReason {
        let decision = rule.evaluate(request, card);
        assert_eq!(decision.approved, decision.decline_reason == DeclineReason::None);
        decision.decline_reason
    }

    // TransactionType

    #[test]
    fn transaction_type_requires_exact_authorization() {
        let card = card(CardStatus::Open, 100_000, 0);
        let mut request = request();
        assert_eq!(reason(Rule::TransactionType, &request, &card), DeclineReason::None);

        for other in ["", "authorization", "AUTHORIZATION.REVERSAL", "REFUND"] {
            request.transaction_type = other.to_string();
            assert_eq!(
                reason(Rule::TransactionType, &request, &card),
                DeclineReason::InvalidTransactionType,
                "{other:?}"
            );
        }
    }

    // ActiveToDate

    #[test]
    fn active_to_date_declines_only_after_the_date() {
        let card = card(CardStatus::Open, 100_000, 0);
        let mut request = request();

        request.transaction_date = card.active_to_date;
        assert_eq!(reason(Rule::ActiveToDate, &request, &card), DeclineReason::None);

        request.transaction_date = card.active_to_date - Duration::days(1);
        assert_eq!(reason(Rule::ActiveToDate, &request, &card), DeclineReason::None);

        request.transaction_date = card.active_to_date + Duration::seconds(1);
        assert_eq!(reason(Rule::ActiveToDate, &request, &card), DeclineReason::CardExpired);
    }

    // CardStatus

    #[test]
    fn card_status_accepts_open_and_authorized() {
        let request = request();
        for (status, expected) in [
            (CardStatus::Open, DeclineReason::None),
            (CardStatus::Authorized, DeclineReason::None),
            (CardStatus::Cancelled, DeclineReason::InvalidCardStatus),
            (CardStatus::Closed, DeclineReason::InvalidCardStatus),
            (CardStatus::Error, DeclineReason::InvalidCardStatus),
        ] {
            let card = card(status, 100_000, 0);
            assert_eq!(reason(Rule::CardStatus, &request, &card), expected, "{status:?}");
        }
    }

    // AvailableBalance

    fn min_amount_request(cents: i64) -> FundingRequest {
        let mut request = request();
        request.is_min_amount_required = true;
        request.transaction_amount = Amount::from_cents(cents);
        request
    }

    #[test]
    fn min_amount_window_is_inclusive() {
        // base 1000.00, tolerance 100.00
        let card = card(CardStatus::Open, 100_000, 0);

        for cents in [90_000, 95_000, 100_000] {
            assert_eq!(
                reason(Rule::AvailableBalance, &min_amount_request(cents), &card),
                DeclineReason::None,
                "{cents}"
            );
        }
        for cents in [89_999, 100_001, 0] {
            assert_eq!(
                reason(Rule::AvailableBalance, &min_amount_request(cents), &card),
                DeclineReason::AmountMismatch,
                "{cents}"
            );
        }
    }

    #[test]
    fn min_amount_card_is_funded_once() {
        let card = card(CardStatus::Authorized, 0, 100_000);
        for cents in [90_000, 100_000, 1] {
            assert_eq!(
                reason(Rule::AvailableBalance, &min_amount_request(cents), &card),
                DeclineReason::PreviouslyAuthorized
            );
        }
    }

    #[test]
    fn open_amount_is_bounded_by_available_balance() {
        let card = card(CardStatus::Authorized, 50_000, 50_000);
        let mut request = request();

        request.transaction_amount = Amount::from_cents(50_000);
        assert_eq!(reason(Rule::AvailableBalance, &request, &card), DeclineReason::None);

        request.transaction_amount = Amount::from_cents(1);
        assert_eq!(reason(Rule::AvailableBalance, &request, &card), DeclineReason::None);

        request.transaction_amount = Amount::from_cents(50_001);
        assert_eq!(
            reason(Rule::AvailableBalance, &request, &card),
            DeclineReason::AmountTooHigh
        );
    }

    // Funded

    #[test]
    fn funded_requires_all_three_conditions() {
        let authorized = card(CardStatus::Authorized, 0, 100_000);
        let open = card(CardStatus::Open, 100_000, 0);

        let mut request = min_amount_request(100_000);
        request.lease_status = "FUNDED".to_string();
        assert_eq!(
            reason(Rule::Funded, &request, &authorized),
            DeclineReason::LeaseAlreadyFunded
        );
        assert_eq!(reason(Rule::Funded, &request, &open), DeclineReason::None);

        request.is_min_amount_required = false;
        assert_eq!(reason(Rule::Funded, &request, &authorized), DeclineReason::None);

        request.is_min_amount_required = true;
        request.lease_status = "APPROVED".to_string();
        assert_eq!(reason(Rule::Funded, &request, &authorized), DeclineReason::None);
    }

    // State

    #[test]
    fn state_is_ignored_without_validation() {
        let card = card(CardStatus::Open, 100_000, 0);
        let mut request = request();
        request.use_state_validation = false;
        request.transaction_state = String::new();
        request.store_address_state = "TX".to_string();
        assert_eq!(reason(Rule::State, &request, &card), DeclineReason::None);
    }

    #[test]
    fn state_validation() {
        let card = card(CardStatus::Open, 100_000, 0);
        let mut request = request();
        request.use_state_validation = true;

        for (transaction, store, expected) in [
            ("TX", "TX", DeclineReason::None),
            ("", "TX", DeclineReason::StateMissing),
            ("TX", "", DeclineReason::StateMissing),
            ("  ", "TX", DeclineReason::StateMissing),
            ("TX", "OK", DeclineReason::StateMismatch),
            ("TX ", "TX", DeclineReason::StateMismatch),
            ("TX", "tx", DeclineReason::StateMismatch),
        ] {
            request.transaction_state = transaction.to_string();
            request.store_address_state = store.to_string();
            assert_eq!(reason(Rule::State, &request, &card), expected, "{transaction:?}/{store:?}");
        }
    }
}
