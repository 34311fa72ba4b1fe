//! Provider credit-limit tracking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{ProviderCreditLimit, ProviderId};
use crate::store::{ProviderStore, StoreError};

#[derive(Debug, Error)]
pub enum CreditLimitError {
    #[error("provider {0} has no credit limit configured")]
    ProviderNotFound(ProviderId),

    #[error("credit limit lookup for provider {provider} failed: {source}")]
    Store {
        provider: ProviderId,
        #[source]
        source: StoreError,
    },
}

/// Decides whether a provider's rolling authorization total crossed its cutoff.
pub struct CreditLimitTracker {
    providers: Arc<dyn ProviderStore>,
    /// Window used when a provider row carries no window of its own.
    default_auth_expire_days: u32,
}

impl CreditLimitTracker {
    pub fn new(providers: Arc<dyn ProviderStore>, default_auth_expire_days: u32) -> Self {
        Self {
            providers,
            default_auth_expire_days,
        }
    }

    pub async fn is_credit_limit_reached(
        &self,
        provider_id: ProviderId,
    ) -> Result<bool, CreditLimitError> {
        Ok(self.status(provider_id).await?.credit_limit_reached)
    }

    /// The provider's limit with `credit_limit_reached` computed as of now.
    pub async fn status(
        &self,
        provider_id: ProviderId,
    ) -> Result<ProviderCreditLimit, CreditLimitError> {
        self.status_at(provider_id, Utc::now()).await
    }

    pub async fn status_at(
        &self,
        provider_id: ProviderId,
        now: DateTime<Utc>,
    ) -> Result<ProviderCreditLimit, CreditLimitError> {
        let mut limit = self
            .providers
            .fetch_credit_limit(provider_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => CreditLimitError::ProviderNotFound(provider_id),
                source => CreditLimitError::Store {
                    provider: provider_id,
                    source,
                },
            })?;

        if limit.is_unlimited() {
            limit.credit_limit_reached = false;
            return Ok(limit);
        }

        let days = match limit.auth_expire_days {
            0 => self.default_auth_expire_days,
            days => days,
        };
        let window_start = now - Duration::days(i64::from(days));
        let total = self
            .providers
            .aggregate_authorized_amount(provider_id, window_start)
            .await
            .map_err(|source| CreditLimitError::Store {
                provider: provider_id,
                source,
            })?;

        let cutoff = limit.cutoff();
        limit.credit_limit_reached = total > cutoff;

        if limit.credit_limit_reached {
            warn!(
                provider = provider_id,
                total = %total,
                cutoff = %cutoff,
                "provider credit limit reached"
            );
        } else {
            info!(provider = provider_id, total = %total, cutoff = %cutoff, "provider within credit limit");
        }
        Ok(limit)
    }
}
