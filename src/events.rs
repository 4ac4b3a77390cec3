//! Structured per-round status events
//!
//! Each engine call describes what happened in numbers. Text rendering is left
//! to [`crate::narration`] or whatever front end consumes the event.

use crate::types::AgentID;
use serde::{Deserialize, Serialize};

/// Outcome tag returned by every round advance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Continue,
    DealReached,
    DealFailed,
    Completed,
    Cancelled,
}

impl RoundOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoundOutcome::Continue)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundSummary {
    /// Opening ask and bid have been placed
    NegotiationOpened { ask: f64, bid: f64 },
    /// Both sides conceded and talks continue
    NegotiationRound {
        round: u32,
        max_rounds: u32,
        ask: f64,
        bid: f64,
        spread: f64,
    },
    DealReached { round: u32, price: f64 },
    DealFailed { round: u32, spread: f64 },
    /// Opening bids placed by every active buyer
    AuctionOpened {
        max_rounds: u32,
        buyers: usize,
        highest: f64,
    },
    AuctionRound {
        round: u32,
        max_rounds: u32,
        remaining: usize,
        eliminated: usize,
        highest: f64,
    },
    AuctionWon {
        round: u32,
        winner: AgentID,
        price: f64,
        last_standing: bool,
    },
    AuctionCancelled { round: u32 },
    /// Session stopped by its driver before reaching a decision
    Aborted { round: u32 },
}

impl RoundSummary {
    /// Whether this event closes its session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RoundSummary::DealReached { .. }
                | RoundSummary::DealFailed { .. }
                | RoundSummary::AuctionWon { .. }
                | RoundSummary::AuctionCancelled { .. }
                | RoundSummary::Aborted { .. }
        )
    }
}
