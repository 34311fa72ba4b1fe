//! Card ledger.
//!
//! Applies provider-confirmed authorizations and reversals to a card's
//! balances and status. The authorization row and the card update are handed
//! to the card store as one atomic call, so a failed apply leaves nothing
//! behind and the caller may apply the same record again.

use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::model::{AuthorizationRecord, LeaseId};
use crate::store::{CardStore, StoreError, StoreErrorKind};

pub(crate) mod state;
pub use state::{CardSnapshot, CardStatus};

mod outcome;
pub use outcome::{LedgerOutcome, SoftFail};

pub struct CardLedger {
    cards: Arc<dyn CardStore>,
    reversal_code: String,
}

/// Public API
impl CardLedger {
    pub fn new(cards: Arc<dyn CardStore>, reversal_code: impl Into<String>) -> Self {
        Self {
            cards,
            reversal_code: reversal_code.into(),
        }
    }

    /// Apply every authorization of the stream, in order.
    pub async fn run(&self, mut stream: impl Stream<Item = AuthorizationRecord> + Unpin) {
        while let Some(record) = stream.next().await {
            // failures are logged by `apply` and must not stop the stream
            let _ = self.apply(&record).await;
        }
    }

    /// Record an authorization and, when approved, move its amount onto the
    /// card.
    ///
    /// Duplicate authorizations and unknown cards are absorbed as
    /// [`LedgerOutcome::SoftFail`]; any other store failure is returned as is.
    pub async fn apply(&self, record: &AuthorizationRecord) -> Result<LedgerOutcome, StoreError> {
        let approved = record.is_approved();
        let amount = record.effective_amount(&self.reversal_code);
        let update = move |card: &mut CardSnapshot| {
            if approved {
                card.apply_approved(amount);
            }
        };

        let card = match self.cards.apply_authorization(record, &update).await {
            Ok(card) => card,
            Err(e) => return self.absorb(record, e),
        };

        if approved {
            info!(
                card = %card.card_id,
                auth = %record.network_auth_id,
                amount = %amount,
                available = %card.available_balance,
                balance = %card.card_balance,
                status = ?card.status,
                "authorization applied"
            );
        } else {
            info!(
                card = %card.card_id,
                reference = %record.reference_id,
                auth = %record.network_auth_id,
                amount = %record.amount,
                "declined authorization recorded"
            );
        }
        Ok(LedgerOutcome::Applied(card))
    }

    /// Cancel a card. Cancelling an already cancelled card is a no-op.
    pub async fn cancel(
        &self,
        lease_id: LeaseId,
        reference_id: &str,
    ) -> Result<CardSnapshot, StoreError> {
        let mut card = self.cards.fetch_card(lease_id, reference_id).await?;
        if card.is_cancelled() {
            return Ok(card);
        }

        card.cancel();
        let saved = self.cards.save_card(&card).await?;
        info!(card = %saved.card_id, lease = %lease_id, "card cancelled");
        Ok(saved)
    }
}

/// Private API
impl CardLedger {
    fn absorb(
        &self,
        record: &AuthorizationRecord,
        e: StoreError,
    ) -> Result<LedgerOutcome, StoreError> {
        let soft_fail = match e.kind() {
            StoreErrorKind::DuplicateKey => SoftFail::DuplicateAuthorization,
            StoreErrorKind::NotFound => SoftFail::CardNotFound,
            StoreErrorKind::Conflict | StoreErrorKind::Backend => {
                error!(
                    reference = %record.reference_id,
                    auth = %record.network_auth_id,
                    reason = %e,
                    "failed to record authorization"
                );
                return Err(e);
            }
        };

        warn!(
            reference = %record.reference_id,
            auth = %record.network_auth_id,
            reason = %soft_fail,
            "authorization skipped"
        );
        Ok(LedgerOutcome::SoftFail(soft_fail))
    }
}
