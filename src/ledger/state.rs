use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Amount;
use crate::model::{CardId, LeaseId, ProviderId};

/// Lifecycle status of a virtual card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CardStatus {
    #[default]
    Open,
    Authorized,
    Cancelled,
    Closed,
    Error,
}

impl CardStatus {
    /// Whether the card may still be funded.
    pub fn is_fundable(&self) -> bool {
        matches!(self, CardStatus::Open | CardStatus::Authorized)
    }
}

/// A card with its balances and status as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub card_id: CardId,
    pub lease_id: LeaseId,
    pub reference_id: String,
    pub provider_id: ProviderId,
    pub product_type: String,
    pub status: CardStatus,
    pub available_balance: Amount,
    /// Outstanding amount owed on the card.
    pub card_balance: Amount,
    pub original_card_base_amount: Amount,
    /// Tolerance below the base amount for minimum-amount cards.
    pub max_amount_less: Amount,
    pub active_to_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    /// Concurrency token, bumped by the store on every save.
    #[serde(default)]
    pub version: u64,
}

impl CardSnapshot {
    /// Move `amount` (negative for reversals) from available onto the
    /// outstanding balance and derive the resulting status.
    ///
    /// A cancelled card keeps its status; only balances move.
    pub fn apply_approved(&mut self, amount: Amount) {
        self.available_balance -= amount;
        self.card_balance += amount;

        if self.status != CardStatus::Cancelled {
            self.status = if self.card_balance <= Amount::ZERO {
                CardStatus::Open
            } else {
                CardStatus::Authorized
            };
        }
    }

    pub fn cancel(&mut self) {
        self.status = CardStatus::Cancelled;
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == CardStatus::Cancelled
    }
}
