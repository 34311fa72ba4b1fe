use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AuditStore, CardStore, CardUpdate, ProviderStore, SettlementStore, StoreError};
use crate::Amount;
use crate::audit::DecisionAuditRecord;
use crate::ledger::CardSnapshot;
use crate::model::{
    AuthorizationRecord, CardId, LeaseId, ProviderCreditLimit, ProviderId, REVERSAL_TYPE_CODE,
    SettlementRecord,
};

/// In-memory implementation of every persistence port.
///
/// A single lock serializes all writes, so an authorization and its card
/// update commit together. `save_card` additionally checks versions so a
/// stale read-modify-write is rejected instead of overwriting.
pub struct MemoryStore {
    reversal_code: String,
    inner: Mutex<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    cards: HashMap<CardId, CardSnapshot>,
    /// Keyed by (reference id, network auth id).
    authorizations: HashMap<(String, String), StoredAuthorization>,
    /// Keyed by provider transaction id.
    settlements: HashMap<String, SettlementRecord>,
    audits: Vec<DecisionAuditRecord>,
    credit_limits: HashMap<ProviderId, ProviderCreditLimit>,
}

struct StoredAuthorization {
    provider_id: ProviderId,
    record: AuthorizationRecord,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_reversal_code(REVERSAL_TYPE_CODE)
    }

    /// Use a custom type code when netting reversals in aggregates.
    pub fn with_reversal_code(code: impl Into<String>) -> Self {
        Self {
            reversal_code: code.into(),
            inner: Mutex::new(MemoryStoreInner::default()),
        }
    }

    pub async fn insert_card(&self, card: CardSnapshot) {
        self.inner.lock().await.cards.insert(card.card_id, card);
    }

    pub async fn insert_credit_limit(&self, limit: ProviderCreditLimit) {
        self.inner
            .lock()
            .await
            .credit_limits
            .insert(limit.provider_id, limit);
    }

    pub async fn card(&self, card_id: CardId) -> Option<CardSnapshot> {
        self.inner.lock().await.cards.get(&card_id).cloned()
    }

    /// All cards, ordered by card id.
    pub async fn cards(&self) -> Vec<CardSnapshot> {
        let inner = self.inner.lock().await;
        let mut cards: Vec<_> = inner.cards.values().cloned().collect();
        cards.sort_by_key(|card| card.card_id);
        cards
    }

    pub async fn settlement_count(&self) -> usize {
        self.inner.lock().await.settlements.len()
    }

    pub async fn authorization_count(&self) -> usize {
        self.inner.lock().await.authorizations.len()
    }

    pub async fn audits(&self) -> Vec<DecisionAuditRecord> {
        self.inner.lock().await.audits.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn fetch_card(
        &self,
        lease_id: LeaseId,
        reference_id: &str,
    ) -> Result<CardSnapshot, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .cards
            .values()
            .find(|card| card.lease_id == lease_id && card.reference_id == reference_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("card for lease {lease_id} reference {reference_id}"))
            })
    }

    async fn apply_authorization(
        &self,
        record: &AuthorizationRecord,
        update: CardUpdate<'_>,
    ) -> Result<CardSnapshot, StoreError> {
        let mut inner = self.inner.lock().await;
        let key = (record.reference_id.clone(), record.network_auth_id.clone());
        if inner.authorizations.contains_key(&key) {
            return Err(StoreError::DuplicateKey(format!(
                "authorization {} for reference {}",
                record.network_auth_id, record.reference_id
            )));
        }

        let card = inner
            .cards
            .values_mut()
            .find(|card| card.reference_id == record.reference_id)
            .ok_or_else(|| {
                StoreError::NotFound(format!("card for reference {}", record.reference_id))
            })?;

        let mut updated = card.clone();
        update(&mut updated);
        if updated != *card {
            updated.version = card.version + 1;
            *card = updated;
        }
        let card = card.clone();

        inner.authorizations.insert(
            key,
            StoredAuthorization {
                provider_id: card.provider_id,
                record: record.clone(),
            },
        );
        Ok(card)
    }

    async fn save_card(&self, card: &CardSnapshot) -> Result<CardSnapshot, StoreError> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .cards
            .get_mut(&card.card_id)
            .ok_or_else(|| StoreError::NotFound(format!("card {}", card.card_id)))?;

        if stored.version != card.version {
            return Err(StoreError::Conflict {
                card_id: card.card_id,
                expected: card.version,
                found: stored.version,
            });
        }

        *stored = card.clone();
        stored.version += 1;
        Ok(stored.clone())
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn save_settlement(&self, record: &SettlementRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .settlements
            .contains_key(&record.provider_transaction_id)
        {
            return Err(StoreError::DuplicateKey(format!(
                "settlement {}",
                record.provider_transaction_id
            )));
        }
        inner
            .settlements
            .insert(record.provider_transaction_id.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn save_decision_audit(&self, record: &DecisionAuditRecord) -> Result<(), StoreError> {
        self.inner.lock().await.audits.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn fetch_credit_limit(
        &self,
        provider_id: ProviderId,
    ) -> Result<ProviderCreditLimit, StoreError> {
        self.inner
            .lock()
            .await
            .credit_limits
            .get(&provider_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("credit limit for provider {provider_id}")))
    }

    async fn aggregate_authorized_amount(
        &self,
        provider_id: ProviderId,
        window_start: DateTime<Utc>,
    ) -> Result<Amount, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .authorizations
            .values()
            .filter(|stored| stored.provider_id == provider_id)
            .filter(|stored| stored.record.is_approved())
            .filter(|stored| stored.record.transaction_date >= window_start)
            .map(|stored| stored.record.effective_amount(&self.reversal_code))
            .sum())
    }
}
