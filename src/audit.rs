//! Best-effort audit trail of funding decisions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Amount;
use crate::decision::{Decision, DeclineReason};
use crate::ledger::{CardSnapshot, CardStatus};
use crate::model::{FundingRequest, LeaseId};
use crate::store::AuditStore;

/// What was decided for a funding request, and against which card state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionAuditRecord {
    pub lease_id: LeaseId,
    pub reference_id: String,
    pub transaction_token: String,
    pub transaction_amount: Amount,
    pub approved: bool,
    pub decline_reason: DeclineReason,
    pub card_status: CardStatus,
    pub available_balance: Amount,
    pub card_balance: Amount,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionAuditRecord {
    pub fn new(request: &FundingRequest, card: &CardSnapshot, decision: &Decision) -> Self {
        Self {
            lease_id: request.lease_id,
            reference_id: request.reference_id.clone(),
            transaction_token: request.transaction_token.clone(),
            transaction_amount: request.transaction_amount,
            approved: decision.approved,
            decline_reason: decision.decline_reason,
            card_status: card.status,
            available_balance: card.available_balance,
            card_balance: card.card_balance,
            recorded_at: Utc::now(),
        }
    }
}

/// Persists audit records once; failures are logged and dropped.
#[derive(Clone)]
pub struct DecisionAuditLogger {
    audits: Arc<dyn AuditStore>,
}

impl DecisionAuditLogger {
    pub fn new(audits: Arc<dyn AuditStore>) -> Self {
        Self { audits }
    }

    pub async fn record(&self, request: &FundingRequest, card: &CardSnapshot, decision: &Decision) {
        let record = DecisionAuditRecord::new(request, card, decision);
        save(self.audits.as_ref(), &record).await;
    }

    /// Save the record on a detached task so the caller never waits on it.
    pub fn record_detached(
        &self,
        request: &FundingRequest,
        card: &CardSnapshot,
        decision: &Decision,
    ) {
        let record = DecisionAuditRecord::new(request, card, decision);
        let audits = self.audits.clone();
        tokio::spawn(async move {
            save(audits.as_ref(), &record).await;
        });
    }
}

async fn save(audits: &dyn AuditStore, record: &DecisionAuditRecord) {
    match audits.save_decision_audit(record).await {
        Ok(()) => debug!(token = %record.transaction_token, "decision audit saved"),
        Err(e) => warn!(
            lease = %record.lease_id,
            token = %record.transaction_token,
            reason = %e,
            "failed to save decision audit"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::tests::request;
    use crate::ledger::state::tests::card;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    struct BrokenAuditStore;

    #[async_trait]
    impl AuditStore for BrokenAuditStore {
        async fn save_decision_audit(&self, _: &DecisionAuditRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("audit table locked".to_string()))
        }
    }

    #[test]
    fn record_captures_request_card_and_decision() {
        let request = request();
        let card = card(CardStatus::Open, 100_000, 0);
        let decision = Decision::decline(DeclineReason::AmountTooHigh);

        let record = DecisionAuditRecord::new(&request, &card, &decision);
        assert_eq!(record.lease_id, 100);
        assert_eq!(record.transaction_token, "tok-1");
        assert_eq!(record.transaction_amount, Amount::from_cents(25_000));
        assert!(!record.approved);
        assert_eq!(record.decline_reason, DeclineReason::AmountTooHigh);
        assert_eq!(record.card_status, CardStatus::Open);
        assert_eq!(record.available_balance, Amount::from_cents(100_000));
    }

    #[tokio::test]
    async fn record_persists() {
        let store = Arc::new(MemoryStore::new());
        let logger = DecisionAuditLogger::new(store.clone());

        logger
            .record(&request(), &card(CardStatus::Open, 100_000, 0), &Decision::approve())
            .await;

        let audits = store.audits().await;
        assert_eq!(audits.len(), 1);
        assert!(audits[0].approved);
    }

    #[tokio::test]
    async fn record_swallows_store_failures() {
        let logger = DecisionAuditLogger::new(Arc::new(BrokenAuditStore));
        // completes without panicking or returning an error
        logger
            .record(&request(), &card(CardStatus::Open, 100_000, 0), &Decision::approve())
            .await;
    }
}
