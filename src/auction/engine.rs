//! Battle royale engine: ascending bids with permanent elimination

use crate::error::{ensure_price, MarketError, Result};
use crate::events::{RoundOutcome, RoundSummary};
use crate::random::RandomSource;
use crate::settlement::{emit_success, SettlementVenue};
use crate::types::{round1, AgentID, AgentProfile, Item, Role};
use tracing::{debug, info};

use super::session::AuctionSession;
use super::types::{AuctionStep, Bid};

/// Opening bid as a fraction of the item's current price
const OPENING_BID_RANGE: (f64, f64) = (0.35, 0.60);
/// Reference highest bid, relative to current price, when no bid exists yet
const SEED_HIGHEST: f64 = 0.4;
/// Share of the highest bid used by a buyer without a previous bid
const SEED_OWN_BID: f64 = 0.5;

/// Opening multiplier is `0.8 + aggressiveness/10 * 0.4`
const OPENING_BASE: f64 = 0.8;
const OPENING_AGGRESSION: f64 = 0.4;

/// Budget is `current price * (0.8 + (risk + aggressiveness)/20 * 0.6)`
const BUDGET_BASE: f64 = 0.8;
const BUDGET_APPETITE: f64 = 0.6;

/// Raise is `highest * (0.03 + aggressiveness/10 * 0.12)`
const RAISE_BASE: f64 = 0.03;
const RAISE_AGGRESSION: f64 = 0.12;

/// Final bid is `last own bid * (1.05 + aggressiveness/10 * 0.15)`
const FINAL_BASE: f64 = 1.05;
const FINAL_AGGRESSION: f64 = 0.15;

fn aggression(buyer: &AgentProfile) -> f64 {
    f64::from(buyer.traits().aggressiveness()) / 10.0
}

/// Stateless battle royale engine
#[derive(Clone, Copy, Debug, Default)]
pub struct AuctionEngine;

impl AuctionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Advance the auction by one round.
    ///
    /// `buyers` must list the session's buyers in registration order.
    pub fn advance_round<R: RandomSource + ?Sized>(
        &self,
        session: &AuctionSession,
        seller: &AgentProfile,
        buyers: &[AgentProfile],
        item: &Item,
        rng: &mut R,
    ) -> Result<AuctionStep> {
        Self::check_inputs(session, seller, buyers, item)?;

        let mut next = session.clone();
        let round = session.current_round();
        let active: Vec<&AgentProfile> = buyers
            .iter()
            .filter(|b| session.is_active(b.id()))
            .collect();

        if active.is_empty() {
            next.close_cancelled()?;
            info!(session = %session.id(), round, "auction cancelled, no active buyers");
            return Ok(AuctionStep {
                session: next,
                outcome: RoundOutcome::Cancelled,
                new_bids: Vec::new(),
                summary: RoundSummary::AuctionCancelled { round },
                settlements: Vec::new(),
            });
        }

        if round == 0 {
            self.open(next, &active, item, rng)
        } else if round + 1 >= session.max_rounds() {
            self.final_round(next, seller, buyers, &active, item)
        } else {
            self.bidding_round(next, seller, &active, item)
        }
    }

    fn check_inputs(
        session: &AuctionSession,
        seller: &AgentProfile,
        buyers: &[AgentProfile],
        item: &Item,
    ) -> Result<()> {
        if session.is_terminal() {
            return Err(MarketError::InvalidSessionState(format!(
                "auction {} already closed as {:?}",
                session.id(),
                session.status()
            )));
        }
        if session.current_round() >= session.max_rounds() {
            return Err(MarketError::InvalidSessionState(format!(
                "auction {} is at round {} of {}",
                session.id(),
                session.current_round(),
                session.max_rounds()
            )));
        }

        seller.expect_role(Role::Seller)?;
        if seller.id() != session.seller_id() {
            return Err(MarketError::AgentMismatch(format!(
                "seller {} does not run auction {}",
                seller.id(),
                session.id()
            )));
        }
        if item.id() != session.item_id() {
            return Err(MarketError::AgentMismatch(format!(
                "item {} is not sold in auction {}",
                item.id(),
                session.id()
            )));
        }

        let expected = session.buyer_ids();
        if buyers.len() != expected.len() {
            return Err(MarketError::AgentMismatch(format!(
                "auction {} has {} buyers, got {}",
                session.id(),
                expected.len(),
                buyers.len()
            )));
        }
        for (buyer, id) in buyers.iter().zip(expected) {
            buyer.expect_role(Role::Buyer)?;
            if buyer.id() != id {
                return Err(MarketError::AgentMismatch(format!(
                    "expected buyer {}, got {}",
                    id,
                    buyer.id()
                )));
            }
        }
        Ok(())
    }

    /// Round 0: every buyer places an opening bid scaled by aggressiveness
    fn open<R: RandomSource + ?Sized>(
        &self,
        mut next: AuctionSession,
        active: &[&AgentProfile],
        item: &Item,
        rng: &mut R,
    ) -> Result<AuctionStep> {
        next.begin()?;
        let (lo, hi) = OPENING_BID_RANGE;

        let mut new_bids = Vec::with_capacity(active.len());
        for buyer in active {
            let base = item.current_price() * rng.uniform(lo, hi);
            let amount = round1(base * (OPENING_BASE + aggression(buyer) * OPENING_AGGRESSION));
            let bid = Bid {
                buyer_id: buyer.id().clone(),
                amount: ensure_price("opening_bid", amount)?,
                round: 0,
                eliminated: false,
            };
            next.record_bid(bid.clone())?;
            new_bids.push(bid);
        }

        let highest = new_bids.iter().map(|b| b.amount).fold(0.0, f64::max);
        next.finish_round();

        debug!(session = %next.id(), buyers = active.len(), highest, "auction opened");

        Ok(AuctionStep {
            summary: RoundSummary::AuctionOpened {
                max_rounds: next.max_rounds(),
                buyers: active.len(),
                highest,
            },
            session: next,
            outcome: RoundOutcome::Continue,
            new_bids,
            settlements: Vec::new(),
        })
    }

    /// Mid round: raise over the current highest or drop out on budget breach
    fn bidding_round(
        &self,
        mut next: AuctionSession,
        seller: &AgentProfile,
        active: &[&AgentProfile],
        item: &Item,
    ) -> Result<AuctionStep> {
        let round = next.current_round();
        let highest = next
            .highest_active_bid()
            .unwrap_or(item.current_price() * SEED_HIGHEST);

        let mut new_bids = Vec::with_capacity(active.len());
        let mut survivors: Vec<&AgentProfile> = Vec::with_capacity(active.len());

        for &buyer in active {
            let last_own = next
                .standing(buyer.id())
                .and_then(|s| s.last_bid)
                .unwrap_or(highest * SEED_OWN_BID);

            let traits = buyer.traits();
            let appetite =
                f64::from(traits.risk_tolerance() + traits.aggressiveness()) / 20.0;
            let max_budget = item.current_price() * (BUDGET_BASE + appetite * BUDGET_APPETITE);
            let increment = highest * (RAISE_BASE + aggression(buyer) * RAISE_AGGRESSION);
            let proposed = ensure_price("bid", round1(last_own.max(highest) + increment))?;

            let bid = if proposed > max_budget || proposed > buyer.balance() {
                debug!(
                    session = %next.id(),
                    buyer = %buyer.id(),
                    proposed,
                    max_budget,
                    "buyer eliminated"
                );
                Bid {
                    buyer_id: buyer.id().clone(),
                    amount: last_own,
                    round,
                    eliminated: true,
                }
            } else {
                survivors.push(buyer);
                Bid {
                    buyer_id: buyer.id().clone(),
                    amount: proposed,
                    round,
                    eliminated: false,
                }
            };
            next.record_bid(bid.clone())?;
            new_bids.push(bid);
        }

        let eliminated = active.len() - survivors.len();
        let round_high = new_bids
            .iter()
            .filter(|b| !b.eliminated)
            .map(|b| b.amount)
            .fold(0.0, f64::max);

        if let [winner] = survivors.as_slice() {
            let price = next
                .standing(winner.id())
                .and_then(|s| s.last_bid)
                .ok_or_else(|| MarketError::UnknownAgent(winner.id().0.clone()))?;
            return self.settle(next, seller, winner, item, price, new_bids, true);
        }

        next.finish_round();
        debug!(
            session = %next.id(),
            round,
            remaining = survivors.len(),
            eliminated,
            highest = round_high,
            "auction round"
        );

        Ok(AuctionStep {
            summary: RoundSummary::AuctionRound {
                round,
                max_rounds: next.max_rounds(),
                remaining: survivors.len(),
                eliminated,
                highest: round_high,
            },
            session: next,
            outcome: RoundOutcome::Continue,
            new_bids,
            settlements: Vec::new(),
        })
    }

    /// Last round: forced final bids, then the best standing bid wins
    fn final_round(
        &self,
        mut next: AuctionSession,
        seller: &AgentProfile,
        buyers: &[AgentProfile],
        active: &[&AgentProfile],
        item: &Item,
    ) -> Result<AuctionStep> {
        let round = next.current_round();
        let highest = next
            .highest_active_bid()
            .unwrap_or(item.current_price() * SEED_HIGHEST);

        let mut new_bids = Vec::with_capacity(active.len());
        for &buyer in active {
            let last_own = next
                .standing(buyer.id())
                .and_then(|s| s.last_bid)
                .unwrap_or(highest);
            let amount = round1(last_own * (FINAL_BASE + aggression(buyer) * FINAL_AGGRESSION));
            let bid = Bid {
                buyer_id: buyer.id().clone(),
                amount: ensure_price("final_bid", amount)?,
                round,
                eliminated: false,
            };
            next.record_bid(bid.clone())?;
            new_bids.push(bid);
        }

        let (winner_id, price) = Self::best_bid(next.bids(), next.buyer_ids())
            .ok_or_else(|| MarketError::InvalidSessionState(format!(
                "auction {} has no standing bid",
                next.id()
            )))?;
        let winner = buyers
            .iter()
            .find(|b| b.id() == &winner_id)
            .ok_or_else(|| MarketError::UnknownAgent(winner_id.0.clone()))?;

        self.settle(next, seller, winner, item, price, new_bids, false)
    }

    /// Highest non-eliminated bid of the whole session; ties go to the
    /// buyer registered first
    fn best_bid(bids: &[Bid], order: &[AgentID]) -> Option<(AgentID, f64)> {
        let rank = |id: &AgentID| order.iter().position(|o| o == id).unwrap_or(usize::MAX);

        bids.iter()
            .filter(|b| !b.eliminated)
            .fold(None::<&Bid>, |best, bid| match best {
                Some(current)
                    if current.amount > bid.amount
                        || (current.amount == bid.amount
                            && rank(&current.buyer_id) <= rank(&bid.buyer_id)) =>
                {
                    Some(current)
                }
                _ => Some(bid),
            })
            .map(|b| (b.buyer_id.clone(), b.amount))
    }

    #[allow(clippy::too_many_arguments)]
    fn settle(
        &self,
        mut next: AuctionSession,
        seller: &AgentProfile,
        winner: &AgentProfile,
        item: &Item,
        price: f64,
        new_bids: Vec<Bid>,
        last_standing: bool,
    ) -> Result<AuctionStep> {
        let round = next.current_round();
        let settlements = emit_success(
            next.id(),
            item,
            SettlementVenue::BattleRoyale,
            winner,
            seller,
            price,
        )?;
        next.complete(winner.id().clone(), price)?;

        info!(
            session = %next.id(),
            round,
            winner = %winner.id(),
            price,
            last_standing,
            "auction won"
        );

        Ok(AuctionStep {
            session: next,
            outcome: RoundOutcome::Completed,
            new_bids,
            summary: RoundSummary::AuctionWon {
                round,
                winner: winner.id().clone(),
                price,
                last_standing,
            },
            settlements,
        })
    }
}
