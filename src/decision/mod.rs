//! JIT funding decision engine.
//!
//! The engine runs every [`Rule`] in [`Rule::ORDER`] against a funding
//! request and the card it targets. The first decline stops evaluation and
//! is returned; later rules never run. The engine holds no state and can be
//! shared freely across concurrent requests.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::CardSnapshot;
use crate::model::FundingRequest;

mod reason;
pub use reason::DeclineReason;

mod rules;
pub use rules::Rule;

/// Outcome of a rule or of a whole evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    pub decline_reason: DeclineReason,
}

impl Decision {
    pub fn approve() -> Self {
        Self {
            approved: true,
            decline_reason: DeclineReason::None,
        }
    }

    pub fn decline(reason: DeclineReason) -> Self {
        Self {
            approved: false,
            decline_reason: reason,
        }
    }

    pub fn message(&self) -> &'static str {
        self.decline_reason.message()
    }
}

/// Evaluates funding requests against the fixed rule chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, request: &FundingRequest, card: &CardSnapshot) -> Decision {
        let mut decision = Decision::approve();

        for rule in Rule::ORDER {
            decision = rule.evaluate(request, card);
            if !decision.approved {
                debug!(
                    lease = %request.lease_id,
                    token = %request.transaction_token,
                    rule = rule.name(),
                    reason = %decision.decline_reason,
                    "funding request declined"
                );
                break;
            }
        }

        decision
    }
}
