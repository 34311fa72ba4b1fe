//! Settlement reconciliation.
//!
//! A batch is persisted one record at a time so that a failing record never
//! affects the others. Re-delivered records (duplicate provider transaction
//! ids) are treated as already saved.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::model::SettlementRecord;
use crate::store::{SettlementStore, StoreError, StoreErrorKind};

/// A record that could not be saved.
#[derive(Debug)]
pub struct SettlementFailure {
    pub provider_transaction_id: String,
    pub error: StoreError,
}

/// One or more records of a batch failed for reasons other than duplication.
#[derive(Debug, Error)]
#[error(
    "{failed} of {total} settlement records failed: {ids}",
    failed = .failures.len(),
    ids = join_ids(.failures)
)]
pub struct ReconcileError {
    pub total: usize,
    pub failures: Vec<SettlementFailure>,
}

impl ReconcileError {
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.failures
            .iter()
            .map(|failure| failure.provider_transaction_id.as_str())
    }
}

fn join_ids(failures: &[SettlementFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.provider_transaction_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Counts for a fully reconciled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub total: usize,
    pub saved: usize,
    pub duplicates: usize,
}

pub struct SettlementReconciler {
    settlements: Arc<dyn SettlementStore>,
}

impl SettlementReconciler {
    pub fn new(settlements: Arc<dyn SettlementStore>) -> Self {
        Self { settlements }
    }

    /// Persist every record of the batch, sequentially.
    pub async fn reconcile(
        &self,
        batch: &[SettlementRecord],
    ) -> Result<ReconcileSummary, ReconcileError> {
        let mut summary = ReconcileSummary {
            total: batch.len(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        for record in batch {
            match self.settlements.save_settlement(record).await {
                Ok(()) => summary.saved += 1,
                Err(e) if e.kind() == StoreErrorKind::DuplicateKey => {
                    warn!(
                        lease = %record.lease_id,
                        provider_tx = %record.provider_transaction_id,
                        "settlement already recorded"
                    );
                    summary.duplicates += 1;
                }
                Err(e) => {
                    error!(
                        lease = %record.lease_id,
                        provider_tx = %record.provider_transaction_id,
                        reason = %e,
                        "failed to save settlement"
                    );
                    failures.push(SettlementFailure {
                        provider_transaction_id: record.provider_transaction_id.clone(),
                        error: e,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(ReconcileError {
                total: summary.total,
                failures,
            });
        }

        info!(
            total = summary.total,
            saved = summary.saved,
            duplicates = summary.duplicates,
            "settlement batch reconciled"
        );
        Ok(summary)
    }
}
