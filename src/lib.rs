pub mod amount;
pub mod audit;
pub mod config;
pub mod credit_limit;
pub mod csv;
pub mod decision;
pub mod ledger;
pub mod model;
pub mod service;
pub mod settlement;
pub mod store;

pub use amount::Amount;
pub use config::Config;
pub use decision::{Decision, DecisionEngine, DeclineReason};
pub use ledger::{CardLedger, CardSnapshot, CardStatus, LedgerOutcome};
pub use model::{AuthorizationRecord, FundingRequest, SettlementRecord};
pub use service::FundingService;
pub use store::MemoryStore;
