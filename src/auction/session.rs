//! Battle royale auction session state

use crate::config::AuctionRules;
use crate::error::{MarketError, Result};
use crate::events::RoundSummary;
use crate::types::{AgentID, AgentProfile, Item, ItemID, Role, SessionID};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use super::types::{AuctionStatus, Bid, BuyerStanding};

/// An ascending auction between one seller and several buyers.
///
/// The bid log is append-only. `standings` mirrors it per buyer so the
/// active set is available without rescanning the log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSession {
    id: SessionID,
    seller_id: AgentID,
    buyer_ids: Vec<AgentID>,
    item_id: ItemID,
    status: AuctionStatus,
    bids: Vec<Bid>,
    standings: HashMap<AgentID, BuyerStanding>,
    current_round: u32,
    max_rounds: u32,
    winner_id: Option<AgentID>,
    winning_price: Option<f64>,
    created_at: SystemTime,
    completed_at: Option<SystemTime>,
}

impl AuctionSession {
    pub fn new(
        seller: &AgentProfile,
        buyers: &[AgentProfile],
        item: &Item,
        rules: &AuctionRules,
    ) -> Result<Self> {
        rules.validate()?;
        seller.expect_role(Role::Seller)?;

        if buyers.len() < rules.min_buyers {
            return Err(MarketError::InsufficientBuyers {
                required: rules.min_buyers,
                available: buyers.len(),
            });
        }

        let mut seen = HashSet::new();
        for buyer in buyers {
            buyer.expect_role(Role::Buyer)?;
            if !seen.insert(buyer.id().clone()) {
                return Err(MarketError::AgentMismatch(format!(
                    "buyer {} listed twice",
                    buyer.id()
                )));
            }
        }

        let buyer_ids: Vec<AgentID> = buyers.iter().map(|b| b.id().clone()).collect();
        let standings = buyer_ids
            .iter()
            .map(|id| (id.clone(), BuyerStanding::default()))
            .collect();

        Ok(Self {
            id: SessionID::generate(),
            seller_id: seller.id().clone(),
            buyer_ids,
            item_id: item.id().clone(),
            status: AuctionStatus::Waiting,
            bids: Vec::new(),
            standings,
            current_round: 0,
            max_rounds: rules.max_rounds,
            winner_id: None,
            winning_price: None,
            created_at: SystemTime::now(),
            completed_at: None,
        })
    }

    pub fn id(&self) -> &SessionID {
        &self.id
    }

    pub fn seller_id(&self) -> &AgentID {
        &self.seller_id
    }

    /// Buyers in registration order; earlier buyers win ties
    pub fn buyer_ids(&self) -> &[AgentID] {
        &self.buyer_ids
    }

    pub fn item_id(&self) -> &ItemID {
        &self.item_id
    }

    pub fn status(&self) -> AuctionStatus {
        self.status
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn winner_id(&self) -> Option<&AgentID> {
        self.winner_id.as_ref()
    }

    pub fn winning_price(&self) -> Option<f64> {
        self.winning_price
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn standing(&self, buyer: &AgentID) -> Option<&BuyerStanding> {
        self.standings.get(buyer)
    }

    pub fn is_active(&self, buyer: &AgentID) -> bool {
        self.standings
            .get(buyer)
            .map(BuyerStanding::is_active)
            .unwrap_or(false)
    }

    /// Buyers not yet eliminated, in registration order
    pub fn active_buyers(&self) -> Vec<&AgentID> {
        self.buyer_ids
            .iter()
            .filter(|id| self.is_active(id))
            .collect()
    }

    /// Highest latest bid among active buyers
    pub fn highest_active_bid(&self) -> Option<f64> {
        self.buyer_ids
            .iter()
            .filter_map(|id| self.standings.get(id))
            .filter(|s| s.is_active())
            .filter_map(|s| s.last_bid)
            .reduce(f64::max)
    }

    /// Abort the auction. No settlement is produced.
    ///
    /// Returns the [`RoundSummary::Aborted`] event for the driver to render.
    pub fn cancel(&mut self) -> Result<RoundSummary> {
        self.set_status(AuctionStatus::Cancelled)?;
        self.completed_at = Some(SystemTime::now());
        Ok(RoundSummary::Aborted {
            round: self.current_round,
        })
    }

    fn set_status(&mut self, next: AuctionStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::InvalidSessionState(format!(
                "auction {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        Ok(())
    }

    pub(crate) fn begin(&mut self) -> Result<()> {
        self.set_status(AuctionStatus::Bidding)
    }

    /// Append a bid, keeping the per-buyer standing in step
    pub(crate) fn record_bid(&mut self, bid: Bid) -> Result<()> {
        let standing = self
            .standings
            .get_mut(&bid.buyer_id)
            .ok_or_else(|| MarketError::UnknownAgent(bid.buyer_id.0.clone()))?;

        if let Some(round) = standing.eliminated_in {
            return Err(MarketError::InvalidSessionState(format!(
                "buyer {} was eliminated in round {}",
                bid.buyer_id, round
            )));
        }
        if let Some(last) = standing.last_round.filter(|&last| bid.round <= last) {
            return Err(MarketError::InvalidSessionState(format!(
                "buyer {} already bid in round {}, got a bid for round {}",
                bid.buyer_id, last, bid.round
            )));
        }

        standing.last_round = Some(bid.round);
        if bid.eliminated {
            standing.eliminated_in = Some(bid.round);
        } else {
            standing.last_bid = Some(bid.amount);
        }

        self.bids.push(bid);
        Ok(())
    }

    pub(crate) fn finish_round(&mut self) {
        self.current_round += 1;
    }

    pub(crate) fn complete(&mut self, winner: AgentID, price: f64) -> Result<()> {
        self.set_status(AuctionStatus::Completed)?;
        self.winner_id = Some(winner);
        self.winning_price = Some(price);
        self.current_round += 1;
        self.completed_at = Some(SystemTime::now());
        Ok(())
    }

    pub(crate) fn close_cancelled(&mut self) -> Result<()> {
        self.set_status(AuctionStatus::Cancelled)?;
        self.current_round += 1;
        self.completed_at = Some(SystemTime::now());
        Ok(())
    }
}
