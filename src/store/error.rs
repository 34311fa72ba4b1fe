//! Errors reported by persistence ports.

use thiserror::Error;

use crate::model::CardId;

/// Failure kind reported alongside every store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    DuplicateKey,
    NotFound,
    Conflict,
    Backend,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("card {card_id} was modified concurrently: expected version {expected}, found {found}")]
    Conflict {
        card_id: CardId,
        expected: u64,
        found: u64,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            StoreError::DuplicateKey(_) => StoreErrorKind::DuplicateKey,
            StoreError::NotFound(_) => StoreErrorKind::NotFound,
            StoreError::Conflict { .. } => StoreErrorKind::Conflict,
            StoreError::Backend(_) => StoreErrorKind::Backend,
        }
    }
}
