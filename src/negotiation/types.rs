//! Negotiation types and state machine

use crate::events::{RoundOutcome, RoundSummary};
use crate::settlement::SettlementRecord;
use serde::{Deserialize, Serialize};

use super::session::NegotiationSession;

/// Negotiation state machine: `Waiting -> Negotiating -> {DealReached | DealFailed}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    /// Created, opening offers not yet placed
    Waiting,
    /// Multi-round price discovery in progress
    Negotiating,
    DealReached,
    DealFailed,
}

impl NegotiationStatus {
    /// Check if negotiation is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiationStatus::DealReached | NegotiationStatus::DealFailed
        )
    }

    /// Check if negotiation is active
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving to `next` goes forward through the state machine
    pub fn can_transition_to(&self, next: NegotiationStatus) -> bool {
        match (self, next) {
            (NegotiationStatus::Waiting, NegotiationStatus::Waiting) => false,
            (NegotiationStatus::Waiting, _) => true,
            (NegotiationStatus::Negotiating, NegotiationStatus::Negotiating) => true,
            (NegotiationStatus::Negotiating, next) => next.is_terminal(),
            _ => false,
        }
    }
}

/// Result of one negotiation round advance
#[derive(Clone, Debug)]
pub struct NegotiationStep {
    pub session: NegotiationSession,
    pub outcome: RoundOutcome,
    pub summary: RoundSummary,
    pub settlements: Vec<SettlementRecord>,
}
