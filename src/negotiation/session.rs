//! Negotiation session state

use crate::config::NegotiationRules;
use crate::error::{MarketError, Result};
use crate::events::RoundSummary;
use crate::types::{AgentID, AgentProfile, Item, ItemID, Role, SessionID};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use super::types::NegotiationStatus;

/// A bilateral negotiation between one seller and one buyer.
///
/// Owned by the driver. Prices and round counter only change through
/// [`super::NegotiationEngine::advance_round`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NegotiationSession {
    id: SessionID,
    seller_id: AgentID,
    buyer_id: AgentID,
    item_id: ItemID,
    status: NegotiationStatus,
    current_round: u32,
    max_rounds: u32,
    ask_price: f64,
    bid_price: f64,
    final_price: Option<f64>,
    created_at: SystemTime,
    completed_at: Option<SystemTime>,
}

impl NegotiationSession {
    /// Create a new session; the opening round places the first bid
    pub fn new(
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
        rules: &NegotiationRules,
    ) -> Result<Self> {
        rules.validate()?;
        seller.expect_role(Role::Seller)?;
        buyer.expect_role(Role::Buyer)?;

        Ok(Self {
            id: SessionID::generate(),
            seller_id: seller.id().clone(),
            buyer_id: buyer.id().clone(),
            item_id: item.id().clone(),
            status: NegotiationStatus::Waiting,
            current_round: 0,
            max_rounds: rules.max_rounds,
            ask_price: item.current_price(),
            bid_price: 0.0,
            final_price: None,
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

    pub fn buyer_id(&self) -> &AgentID {
        &self.buyer_id
    }

    pub fn item_id(&self) -> &ItemID {
        &self.item_id
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn ask_price(&self) -> f64 {
        self.ask_price
    }

    pub fn bid_price(&self) -> f64 {
        self.bid_price
    }

    /// Agreed price, set only once a deal is reached
    pub fn final_price(&self) -> Option<f64> {
        self.final_price
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Abort the session. No settlement is produced.
    ///
    /// Returns the [`RoundSummary::Aborted`] event for the driver to render.
    pub fn cancel(&mut self) -> Result<RoundSummary> {
        self.set_status(NegotiationStatus::DealFailed)?;
        self.completed_at = Some(SystemTime::now());
        Ok(RoundSummary::Aborted {
            round: self.current_round,
        })
    }

    /// Update status, refusing backward or post-terminal moves
    fn set_status(&mut self, next: NegotiationStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(MarketError::InvalidSessionState(format!(
                "negotiation {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        Ok(())
    }

    pub(crate) fn open(&mut self, ask: f64, bid: f64) -> Result<()> {
        self.set_status(NegotiationStatus::Negotiating)?;
        self.ask_price = ask;
        self.bid_price = bid;
        self.current_round = 1;
        Ok(())
    }

    pub(crate) fn concede(&mut self, ask: f64, bid: f64) -> Result<()> {
        self.set_status(NegotiationStatus::Negotiating)?;
        self.ask_price = ask;
        self.bid_price = bid;
        self.current_round += 1;
        Ok(())
    }

    pub(crate) fn close_deal(&mut self, ask: f64, bid: f64, final_price: f64) -> Result<()> {
        self.set_status(NegotiationStatus::DealReached)?;
        self.ask_price = ask;
        self.bid_price = bid;
        self.final_price = Some(final_price);
        self.current_round += 1;
        self.completed_at = Some(SystemTime::now());
        Ok(())
    }

    pub(crate) fn close_failed(&mut self, ask: f64, bid: f64) -> Result<()> {
        self.set_status(NegotiationStatus::DealFailed)?;
        self.ask_price = ask;
        self.bid_price = bid;
        self.current_round += 1;
        self.completed_at = Some(SystemTime::now());
        Ok(())
    }
}
