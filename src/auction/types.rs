//! Auction types and state machine

use crate::events::{RoundOutcome, RoundSummary};
use crate::settlement::SettlementRecord;
use crate::types::AgentID;
use serde::{Deserialize, Serialize};

use super::session::AuctionSession;

/// Auction state machine: `Waiting -> Bidding -> {Completed | Cancelled}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionStatus {
    Waiting,
    Bidding,
    Completed,
    Cancelled,
}

impl AuctionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuctionStatus::Completed | AuctionStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: AuctionStatus) -> bool {
        match (self, next) {
            (AuctionStatus::Waiting, AuctionStatus::Bidding | AuctionStatus::Cancelled) => true,
            (AuctionStatus::Bidding, AuctionStatus::Waiting) => false,
            (AuctionStatus::Bidding, _) => true,
            _ => false,
        }
    }
}

/// A single bid. Eliminated bids repeat the buyer's last amount and mark
/// the round the buyer dropped out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub buyer_id: AgentID,
    pub amount: f64,
    pub round: u32,
    pub eliminated: bool,
}

/// Per-buyer running state, updated as bids are recorded
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerStanding {
    /// Amount of the buyer's most recent non-eliminated bid
    pub last_bid: Option<f64>,
    /// Round of the buyer's most recent bid of any kind
    pub last_round: Option<u32>,
    /// Round in which the buyer dropped out
    pub eliminated_in: Option<u32>,
}

impl BuyerStanding {
    pub fn is_active(&self) -> bool {
        self.eliminated_in.is_none()
    }
}

/// Result of one auction round advance
#[derive(Clone, Debug)]
pub struct AuctionStep {
    pub session: AuctionSession,
    pub outcome: RoundOutcome,
    pub new_bids: Vec<Bid>,
    pub summary: RoundSummary,
    pub settlements: Vec<SettlementRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(AuctionStatus::Completed.is_terminal());
        assert!(AuctionStatus::Cancelled.is_terminal());
        assert!(AuctionStatus::Bidding.is_active());
    }

    #[test]
    fn test_transitions() {
        use AuctionStatus::*;

        assert!(Waiting.can_transition_to(Bidding));
        assert!(Waiting.can_transition_to(Cancelled));
        assert!(!Waiting.can_transition_to(Completed));
        assert!(Bidding.can_transition_to(Bidding));
        assert!(Bidding.can_transition_to(Completed));
        assert!(!Bidding.can_transition_to(Waiting));
        assert!(!Completed.can_transition_to(Bidding));
        assert!(!Cancelled.can_transition_to(Completed));
    }

    #[test]
    fn test_standing_activity() {
        let mut standing = BuyerStanding::default();
        assert!(standing.is_active());
        standing.eliminated_in = Some(2);
        assert!(!standing.is_active());
    }
}
