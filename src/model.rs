//! Core domain types for funding decisions, authorizations and settlements.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Amount;

/// Card identifier.
pub type CardId = i64;

/// Lease identifier (the contract a card is issued against).
pub type LeaseId = i64;

/// Card network provider identifier.
pub type ProviderId = i32;

/// Transaction type the network sends for a funding request.
pub const AUTHORIZATION_TYPE: &str = "AUTHORIZATION";

/// Lease status marking a lease whose card was already funded.
pub const FUNDED_LEASE_STATUS: &str = "FUNDED";

/// Default transaction type code identifying a reversal.
pub const REVERSAL_TYPE_CODE: &str = "AUTHORIZATION.REVERSAL";

/// A JIT funding request sent by the card network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRequest {
    pub lease_id: LeaseId,
    pub reference_id: String,
    pub transaction_token: String,
    pub transaction_amount: Amount,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: String,
    /// Two-letter state where the transaction happened.
    pub transaction_state: String,
    pub lease_status: String,
    /// Two-letter state of the store the lease belongs to.
    pub store_address_state: String,
    pub is_min_amount_required: bool,
    pub use_state_validation: bool,
}

/// Network response carried by an authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthResponse {
    Approval,
    Decline,
}

/// An authorization (or reversal) confirmed by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub reference_id: String,
    pub network_auth_id: String,
    /// Type code as reported by the provider.
    pub transaction_type: String,
    /// Always positive as submitted; reversals are negated on apply.
    pub amount: Amount,
    pub response: AuthResponse,
    pub transaction_date: DateTime<Utc>,
}

impl AuthorizationRecord {
    /// Whether this record reverses a prior authorization, given the
    /// configured reversal type code.
    pub fn is_reversal(&self, reversal_code: &str) -> bool {
        self.transaction_type.eq_ignore_ascii_case(reversal_code)
    }

    /// Signed amount this record moves onto the card.
    pub fn effective_amount(&self, reversal_code: &str) -> Amount {
        if self.is_reversal(reversal_code) {
            -self.amount
        } else {
            self.amount
        }
    }

    pub fn is_approved(&self) -> bool {
        self.response == AuthResponse::Approval
    }
}

/// A settled transaction reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub lease_id: LeaseId,
    pub reference_id: String,
    /// Provider-side identifier, unique across all settlements.
    pub provider_transaction_id: String,
    pub amount: Amount,
    pub posted_date: DateTime<Utc>,
    pub transaction_date: DateTime<Utc>,
    pub transaction_type: String,
}

/// Credit limit configuration of a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCreditLimit {
    pub provider_id: ProviderId,
    /// Zero means unlimited.
    pub credit_limit: Amount,
    /// Fraction of the limit (0..=1) at which the limit is considered reached.
    pub credit_limit_cutoff_percentage: Decimal,
    /// Length of the rolling authorization window.
    pub auth_expire_days: u32,
    /// Computed per query, never persisted.
    #[serde(default, skip_deserializing)]
    pub credit_limit_reached: bool,
}

impl ProviderCreditLimit {
    pub fn is_unlimited(&self) -> bool {
        self.credit_limit.is_zero()
    }

    /// Total above which the limit trips.
    pub fn cutoff(&self) -> Amount {
        self.credit_limit * self.credit_limit_cutoff_percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn authorization(transaction_type: &str, cents: i64) -> AuthorizationRecord {
        AuthorizationRecord {
            reference_id: "ref-1".to_string(),
            network_auth_id: "auth-1".to_string(),
            transaction_type: transaction_type.to_string(),
            amount: Amount::from_cents(cents),
            response: AuthResponse::Approval,
            transaction_date: Utc::now(),
        }
    }

    #[test]
    fn reversal_is_derived_from_type_code() {
        assert!(authorization("AUTHORIZATION.REVERSAL", 100).is_reversal(REVERSAL_TYPE_CODE));
        assert!(authorization("authorization.reversal", 100).is_reversal(REVERSAL_TYPE_CODE));
        assert!(!authorization("AUTHORIZATION", 100).is_reversal(REVERSAL_TYPE_CODE));
    }

    #[test]
    fn effective_amount_negates_reversals() {
        assert_eq!(
            authorization("AUTHORIZATION", 2500).effective_amount(REVERSAL_TYPE_CODE),
            Amount::from_cents(2500)
        );
        assert_eq!(
            authorization("AUTHORIZATION.REVERSAL", 2500).effective_amount(REVERSAL_TYPE_CODE),
            Amount::from_cents(-2500)
        );
    }

    #[test]
    fn cutoff_scales_limit() {
        let limit = ProviderCreditLimit {
            provider_id: 1,
            credit_limit: Amount::new(dec!(100000)),
            credit_limit_cutoff_percentage: dec!(0.8),
            auth_expire_days: 7,
            credit_limit_reached: false,
        };
        assert_eq!(limit.cutoff(), Amount::new(dec!(80000)));
        assert!(!limit.is_unlimited());
    }
}
