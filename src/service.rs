//! Entry points consumed by the HTTP layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::audit::DecisionAuditLogger;
use crate::config::Config;
use crate::credit_limit::{CreditLimitError, CreditLimitTracker};
use crate::decision::{Decision, DecisionEngine};
use crate::ledger::{CardLedger, CardSnapshot, LedgerOutcome};
use crate::model::{AuthorizationRecord, FundingRequest, LeaseId, ProviderId, SettlementRecord};
use crate::settlement::{ReconcileError, ReconcileSummary, SettlementReconciler};
use crate::store::{CardStore, StoreError, Stores};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no card for lease {lease_id} with reference {reference_id}")]
    CardNotFound {
        lease_id: LeaseId,
        reference_id: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Reconcile(#[from] ReconcileError),

    #[error("{0}")]
    CreditLimit(#[from] CreditLimitError),
}

/// Wires the decision engine, ledger, reconciler, credit-limit tracker and
/// audit logger to their stores.
pub struct FundingService {
    cards: Arc<dyn CardStore>,
    engine: DecisionEngine,
    ledger: CardLedger,
    reconciler: SettlementReconciler,
    tracker: CreditLimitTracker,
    audit: DecisionAuditLogger,
    audit_in_background: bool,
}

impl FundingService {
    pub fn new(stores: Stores, config: &Config) -> Self {
        Self {
            cards: stores.cards.clone(),
            engine: DecisionEngine::new(),
            ledger: CardLedger::new(stores.cards, config.reversal_type_code.clone()),
            reconciler: SettlementReconciler::new(stores.settlements),
            tracker: CreditLimitTracker::new(stores.providers, config.auth_expire_days),
            audit: DecisionAuditLogger::new(stores.audits),
            audit_in_background: config.audit_in_background,
        }
    }

    pub fn ledger(&self) -> &CardLedger {
        &self.ledger
    }

    /// Decide a JIT funding request against the card it targets.
    ///
    /// Declines are a normal `Ok` outcome; only a missing card or a store
    /// failure is an error.
    pub async fn evaluate_funding(&self, request: &FundingRequest) -> Result<Decision, ServiceError> {
        let card = self
            .cards
            .fetch_card(request.lease_id, &request.reference_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::CardNotFound {
                    lease_id: request.lease_id,
                    reference_id: request.reference_id.clone(),
                },
                e => {
                    error!(lease = %request.lease_id, reason = %e, "failed to fetch card");
                    ServiceError::Store(e)
                }
            })?;

        let decision = self.engine.evaluate(request, &card);
        info!(
            lease = %request.lease_id,
            token = %request.transaction_token,
            amount = %request.transaction_amount,
            approved = decision.approved,
            reason = %decision.decline_reason,
            "funding request evaluated"
        );

        self.audit(request, &card, &decision).await;
        Ok(decision)
    }

    pub async fn apply_authorization(
        &self,
        record: &AuthorizationRecord,
    ) -> Result<LedgerOutcome, ServiceError> {
        Ok(self.ledger.apply(record).await?)
    }

    pub async fn cancel_card(
        &self,
        lease_id: LeaseId,
        reference_id: &str,
    ) -> Result<CardSnapshot, ServiceError> {
        self.ledger
            .cancel(lease_id, reference_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::CardNotFound {
                    lease_id,
                    reference_id: reference_id.to_string(),
                },
                e => ServiceError::Store(e),
            })
    }

    pub async fn reconcile_settlements(
        &self,
        batch: &[SettlementRecord],
    ) -> Result<ReconcileSummary, ServiceError> {
        Ok(self.reconciler.reconcile(batch).await?)
    }

    pub async fn is_credit_limit_reached(&self, provider_id: ProviderId) -> Result<bool, ServiceError> {
        Ok(self.tracker.is_credit_limit_reached(provider_id).await?)
    }

    async fn audit(&self, request: &FundingRequest, card: &CardSnapshot, decision: &Decision) {
        if self.audit_in_background {
            self.audit.record_detached(request, card, decision);
        } else {
            self.audit.record(request, card, decision).await;
        }
    }
}
