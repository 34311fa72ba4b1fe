//! Persistence ports the core depends on.
//!
//! Implementations enforce uniqueness (authorizations per reference id and
//! network auth id, settlements per provider transaction id) and report
//! violations as [`StoreError::DuplicateKey`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Amount;
use crate::audit::DecisionAuditRecord;
use crate::ledger::CardSnapshot;
use crate::model::{AuthorizationRecord, LeaseId, ProviderCreditLimit, ProviderId, SettlementRecord};

mod error;
pub use error::{StoreError, StoreErrorKind};

mod memory;
pub use memory::MemoryStore;

/// Card mutation run inside [`CardStore::apply_authorization`].
pub type CardUpdate<'a> = &'a (dyn Fn(&mut CardSnapshot) + Send + Sync);

#[async_trait]
pub trait CardStore: Send + Sync {
    /// Look up the card issued for a lease under a network reference id.
    async fn fetch_card(
        &self,
        lease_id: LeaseId,
        reference_id: &str,
    ) -> Result<CardSnapshot, StoreError>;

    /// Record an authorization and apply `update` to the card it belongs to,
    /// as one unit: either the authorization row and the updated card are both
    /// stored, or neither is.
    ///
    /// Fails with `DuplicateKey` when the (reference id, network auth id)
    /// pair was already recorded and with `NotFound` when no card carries
    /// the reference id. A backend that detects a concurrent write to the
    /// card reports `Conflict` after rolling the authorization back, so the
    /// same record can be applied again. A card that `update` leaves
    /// unchanged is not rewritten and keeps its version.
    async fn apply_authorization(
        &self,
        record: &AuthorizationRecord,
        update: CardUpdate<'_>,
    ) -> Result<CardSnapshot, StoreError>;

    /// Persist a card if its version still matches the stored one, returning
    /// the stored snapshot with the bumped version.
    async fn save_card(&self, card: &CardSnapshot) -> Result<CardSnapshot, StoreError>;
}

#[async_trait]
pub trait SettlementStore: Send + Sync {
    async fn save_settlement(&self, record: &SettlementRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn save_decision_audit(&self, record: &DecisionAuditRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn fetch_credit_limit(
        &self,
        provider_id: ProviderId,
    ) -> Result<ProviderCreditLimit, StoreError>;

    /// Rolling exposure of the provider since `window_start` (inclusive).
    ///
    /// Sums approved authorization records dated inside the window. Records
    /// whose type is the reversal code are subtracted instead of added, so a
    /// fully reversed authorization contributes nothing. Declined records are
    /// ignored. Every implementation must net the same way.
    async fn aggregate_authorized_amount(
        &self,
        provider_id: ProviderId,
        window_start: DateTime<Utc>,
    ) -> Result<Amount, StoreError>;
}

/// The full set of ports, as wired into [`FundingService`](crate::FundingService).
#[derive(Clone)]
pub struct Stores {
    pub cards: Arc<dyn CardStore>,
    pub settlements: Arc<dyn SettlementStore>,
    pub audits: Arc<dyn AuditStore>,
    pub providers: Arc<dyn ProviderStore>,
}

impl Stores {
    /// Back every port with the same in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            cards: store.clone(),
            settlements: store.clone(),
            audits: store.clone(),
            providers: store,
        }
    }
}
