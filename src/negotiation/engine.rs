//! Negotiation engine: concession and deal resolution for one seller and one buyer

use crate::error::{ensure_price, MarketError, Result};
use crate::events::{RoundOutcome, RoundSummary};
use crate::random::RandomSource;
use crate::settlement::{emit_failure, emit_success, SettlementVenue};
use crate::types::{round1, AgentProfile, Item, Role};
use tracing::{debug, info};

use super::session::NegotiationSession;
use super::types::NegotiationStep;

/// Opening bid as a fraction of the item's current price
const OPENING_BID_RANGE: (f64, f64) = (0.30, 0.55);
/// Multiplicative jitter applied to every concession
const CONCESSION_JITTER: (f64, f64) = (0.8, 1.2);

const SELLER_BASE_RATE: f64 = 0.03;
const SELLER_PRESSURE_RATE: f64 = 0.06;
const BUYER_BASE_RATE: f64 = 0.04;
const BUYER_PRESSURE_RATE: f64 = 0.08;

/// The ask never drops below this share of the midpoint in one step
const ASK_FLOOR: f64 = 0.9;
/// The bid never rises above this share of the midpoint in one step
const BID_CEILING: f64 = 1.1;

/// Spread, relative to base price, at which a deal is considered
const DEAL_THRESHOLD: f64 = 0.08;
/// Spread, relative to base price, still acceptable once a deal is considered
const ACCEPT_THRESHOLD: f64 = 0.3;

/// Decision taken at the end of a concession round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Accept,
    Reject,
}

/// Decide a round. The check order matters: on the last round the acceptance
/// test always passes, so `Reject` needs a spread within the deal threshold
/// but above the acceptance threshold.
pub fn decide(spread: f64, base_price: f64, last_round: bool) -> Decision {
    if spread <= base_price * DEAL_THRESHOLD || last_round {
        if spread <= base_price * ACCEPT_THRESHOLD || last_round {
            Decision::Accept
        } else {
            Decision::Reject
        }
    } else {
        Decision::Continue
    }
}

/// Stateless negotiation engine.
///
/// Each call consumes a session snapshot and returns the next one; nothing is
/// kept between calls, so independent sessions can be advanced in parallel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NegotiationEngine;

impl NegotiationEngine {
    /// Create new negotiation engine
    pub fn new() -> Self {
        Self
    }

    /// Advance a session by one round
    pub fn advance_round<R: RandomSource + ?Sized>(
        &self,
        session: &NegotiationSession,
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
        rng: &mut R,
    ) -> Result<NegotiationStep> {
        Self::check_inputs(session, seller, buyer, item)?;

        if session.current_round() == 0 {
            self.open(session, item, rng)
        } else {
            self.concede(session, seller, buyer, item, rng)
        }
    }

    fn check_inputs(
        session: &NegotiationSession,
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
    ) -> Result<()> {
        if session.is_terminal() {
            return Err(MarketError::InvalidSessionState(format!(
                "negotiation {} already closed as {:?}",
                session.id(),
                session.status()
            )));
        }
        if session.current_round() >= session.max_rounds() {
            return Err(MarketError::InvalidSessionState(format!(
                "negotiation {} is at round {} of {}",
                session.id(),
                session.current_round(),
                session.max_rounds()
            )));
        }

        seller.expect_role(Role::Seller)?;
        buyer.expect_role(Role::Buyer)?;
        if seller.id() != session.seller_id() {
            return Err(MarketError::AgentMismatch(format!(
                "seller {} is not part of negotiation {}",
                seller.id(),
                session.id()
            )));
        }
        if buyer.id() != session.buyer_id() {
            return Err(MarketError::AgentMismatch(format!(
                "buyer {} is not part of negotiation {}",
                buyer.id(),
                session.id()
            )));
        }
        if item.id() != session.item_id() {
            return Err(MarketError::AgentMismatch(format!(
                "item {} is not traded in negotiation {}",
                item.id(),
                session.id()
            )));
        }
        Ok(())
    }

    /// Round 0: seller anchors at the current price, buyer lowballs
    fn open<R: RandomSource + ?Sized>(
        &self,
        session: &NegotiationSession,
        item: &Item,
        rng: &mut R,
    ) -> Result<NegotiationStep> {
        let (lo, hi) = OPENING_BID_RANGE;
        let ask = ensure_price("ask_price", item.current_price())?;
        let bid = ensure_price("bid_price", item.current_price() * rng.uniform(lo, hi))?;

        let mut next = session.clone();
        next.open(ask, bid)?;

        debug!(session = %session.id(), ask, bid, "negotiation opened");

        Ok(NegotiationStep {
            session: next,
            outcome: RoundOutcome::Continue,
            summary: RoundSummary::NegotiationOpened { ask, bid },
            settlements: Vec::new(),
        })
    }

    fn concede<R: RandomSource + ?Sized>(
        &self,
        session: &NegotiationSession,
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
        rng: &mut R,
    ) -> Result<NegotiationStep> {
        let round = session.current_round();
        let max_rounds = session.max_rounds();
        let ask = session.ask_price();
        let bid = session.bid_price();
        let midpoint = (ask + bid) / 2.0;
        let pressure = f64::from(round) / f64::from(max_rounds);
        let (jitter_lo, jitter_hi) = CONCESSION_JITTER;

        let seller_rate =
            (SELLER_BASE_RATE + pressure * SELLER_PRESSURE_RATE) * rng.uniform(jitter_lo, jitter_hi);
        let new_ask = ensure_price("ask_price", (ask - ask * seller_rate).max(midpoint * ASK_FLOOR))?;

        let buyer_rate =
            (BUYER_BASE_RATE + pressure * BUYER_PRESSURE_RATE) * rng.uniform(jitter_lo, jitter_hi);
        let new_bid = ensure_price("bid_price", (bid + bid * buyer_rate).min(midpoint * BID_CEILING))?;

        let spread = new_ask - new_bid;
        let last_round = round + 1 >= max_rounds;
        let mut next = session.clone();

        match decide(spread, item.base_price(), last_round) {
            Decision::Accept => {
                let price = round1((new_ask + new_bid) / 2.0);
                next.close_deal(new_ask, new_bid, price)?;
                let settlements = emit_success(
                    session.id(),
                    item,
                    SettlementVenue::Negotiation,
                    buyer,
                    seller,
                    price,
                )?;

                info!(session = %session.id(), round, price, "deal reached");

                Ok(NegotiationStep {
                    session: next,
                    outcome: RoundOutcome::DealReached,
                    summary: RoundSummary::DealReached { round, price },
                    settlements,
                })
            }
            Decision::Reject => {
                next.close_failed(new_ask, new_bid)?;

                info!(session = %session.id(), round, spread, "negotiation failed");

                Ok(NegotiationStep {
                    session: next,
                    outcome: RoundOutcome::DealFailed,
                    summary: RoundSummary::DealFailed { round, spread },
                    settlements: emit_failure(session.id(), item, SettlementVenue::Negotiation),
                })
            }
            Decision::Continue => {
                next.concede(new_ask, new_bid)?;

                debug!(
                    session = %session.id(),
                    round,
                    ask = new_ask,
                    bid = new_bid,
                    spread,
                    "negotiation round"
                );

                Ok(NegotiationStep {
                    session: next,
                    outcome: RoundOutcome::Continue,
                    summary: RoundSummary::NegotiationRound {
                        round,
                        max_rounds,
                        ask: new_ask,
                        bid: new_bid,
                        spread,
                    },
                    settlements: Vec::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NegotiationRules;
    use crate::negotiation::NegotiationStatus;
    use crate::random::{FixedRandom, SeededRandom, SequenceRandom};
    use crate::settlement::SettlementKind;
    use crate::types::{AgentID, AgentTraits, ItemID};

    const EPS: f64 = 1e-9;

    fn agents() -> (AgentProfile, AgentProfile) {
        let traits = AgentTraits::new(6, 4, 5, 5).unwrap();
        let seller =
            AgentProfile::new(AgentID::new("seller"), "Vendor", Role::Seller, traits, 0.0).unwrap();
        let buyer =
            AgentProfile::new(AgentID::new("buyer"), "Shopper", Role::Buyer, traits, 500.0).unwrap();
        (seller, buyer)
    }

    fn item(base_price: f64, current_price: f64) -> Item {
        Item::new(ItemID::new("item"), "Cyber Relic", base_price, current_price).unwrap()
    }

    fn new_session(seller: &AgentProfile, buyer: &AgentProfile, item: &Item, max_rounds: u32) -> NegotiationSession {
        NegotiationSession::new(seller, buyer, item, &NegotiationRules { max_rounds }).unwrap()
    }

    /// Drive a session to its terminal step, collecting every step
    fn run_to_end<R: RandomSource>(
        session: NegotiationSession,
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
        rng: &mut R,
    ) -> Vec<NegotiationStep> {
        let engine = NegotiationEngine::new();
        let mut steps = Vec::new();
        let mut current = session;
        loop {
            let step = engine.advance_round(&current, seller, buyer, item, rng).unwrap();
            current = step.session.clone();
            let done = step.outcome.is_terminal();
            steps.push(step);
            if done {
                return steps;
            }
            assert!(steps.len() < 64, "negotiation did not terminate");
        }
    }

    #[test]
    fn test_opening_round() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);

        let step = NegotiationEngine::new()
            .advance_round(&session, &seller, &buyer, &item, &mut FixedRandom::midpoint())
            .unwrap();

        assert_eq!(step.outcome, RoundOutcome::Continue);
        assert_eq!(step.session.status(), NegotiationStatus::Negotiating);
        assert_eq!(step.session.current_round(), 1);
        assert_eq!(step.session.ask_price(), 100.0);
        assert!((step.session.bid_price() - 42.5).abs() < EPS);
        assert!(step.settlements.is_empty());
        // Input snapshot untouched
        assert_eq!(session.current_round(), 0);
    }

    #[test]
    fn test_golden_first_concession() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);
        let engine = NegotiationEngine::new();
        let mut rng = FixedRandom::midpoint();

        let opened = engine
            .advance_round(&session, &seller, &buyer, &item, &mut rng)
            .unwrap();
        let step = engine
            .advance_round(&opened.session, &seller, &buyer, &item, &mut rng)
            .unwrap();

        assert_eq!(step.outcome, RoundOutcome::Continue);
        assert_eq!(step.session.current_round(), 2);
        assert!((step.session.ask_price() - 96.25).abs() < EPS);
        assert!((step.session.bid_price() - 44.625).abs() < EPS);
        match step.summary {
            RoundSummary::NegotiationRound { round, spread, .. } => {
                assert_eq!(round, 1);
                assert!((spread - 51.625).abs() < EPS);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }

    #[test]
    fn test_golden_full_run() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);

        let steps = run_to_end(session, &seller, &buyer, &item, &mut FixedRandom::midpoint());
        let last = steps.last().unwrap();

        // Spread first falls under 8% of base price in round 6
        assert_eq!(last.outcome, RoundOutcome::DealReached);
        assert_eq!(last.summary, RoundSummary::DealReached { round: 6, price: 68.1 });
        assert_eq!(last.session.final_price(), Some(68.1));
        assert_eq!(last.session.current_round(), 7);
        assert_eq!(last.settlements.len(), 4);
    }

    #[test]
    fn test_opening_bid_within_range() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let engine = NegotiationEngine::new();

        for fraction in [0.0, 0.25, 0.5, 0.99, 1.0] {
            let session = new_session(&seller, &buyer, &item, 8);
            let step = engine
                .advance_round(&session, &seller, &buyer, &item, &mut FixedRandom::new(fraction))
                .unwrap();
            let bid = step.session.bid_price();
            assert!(bid >= 30.0 - EPS && bid <= 55.0 + EPS);
            assert!(bid < step.session.ask_price());
        }
    }

    #[test]
    fn test_concession_bounds_hold_for_extreme_draws() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let engine = NegotiationEngine::new();

        for script in [vec![0.0], vec![1.0], vec![0.0, 1.0], vec![1.0, 0.0, 0.5]] {
            let mut rng = SequenceRandom::new(script);
            let mut current = new_session(&seller, &buyer, &item, 8);
            loop {
                let before_ask = current.ask_price();
                let before_bid = current.bid_price();
                let step = engine
                    .advance_round(&current, &seller, &buyer, &item, &mut rng)
                    .unwrap();
                if current.current_round() > 0 {
                    let midpoint = (before_ask + before_bid) / 2.0;
                    assert!(step.session.ask_price() >= midpoint * ASK_FLOOR - EPS);
                    assert!(step.session.bid_price() <= midpoint * BID_CEILING + EPS);
                }
                assert!(step.session.current_round() <= step.session.max_rounds());
                if step.outcome.is_terminal() {
                    break;
                }
                current = step.session;
            }
        }
    }

    #[test]
    fn test_seeded_runs_terminate_with_deal() {
        let (seller, buyer) = agents();

        for seed in 0..200u64 {
            let item = item(20.0 + (seed % 9) as f64 * 15.0, 100.0);
            let session = new_session(&seller, &buyer, &item, 8);
            let steps = run_to_end(session, &seller, &buyer, &item, &mut SeededRandom::new(seed));
            let last = steps.last().unwrap();

            assert!(steps.len() <= 8);
            assert!(last.session.current_round() <= 8);
            assert_eq!(last.outcome, RoundOutcome::DealReached);

            let price = last.session.final_price().unwrap();
            let lo = last.session.ask_price().min(last.session.bid_price());
            let hi = last.session.ask_price().max(last.session.bid_price());
            assert!(price >= round1(lo) - 0.05 - EPS && price <= round1(hi) + 0.05 + EPS);
            assert_eq!(round1(price), price);

            let blocks: Vec<_> = last.settlements.iter().map(|r| r.block_seq).collect();
            assert_eq!(blocks.len(), 4);
            assert!(blocks.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_last_round_forces_acceptance() {
        let (seller, buyer) = agents();
        // A tiny base price keeps the spread above every threshold until the end
        let item = item(1.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 3);

        let steps = run_to_end(session, &seller, &buyer, &item, &mut FixedRandom::midpoint());
        let last = steps.last().unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(last.outcome, RoundOutcome::DealReached);
        assert_eq!(last.session.current_round(), 3);
        assert!(last.session.spread() > item.base_price() * ACCEPT_THRESHOLD);
    }

    #[test]
    fn test_decision_order() {
        assert_eq!(decide(50.0, 80.0, false), Decision::Continue);
        assert_eq!(decide(6.4, 80.0, false), Decision::Accept);
        assert_eq!(decide(-3.0, 80.0, false), Decision::Accept);
        // Forced final round accepts even a wide spread
        assert_eq!(decide(500.0, 80.0, true), Decision::Accept);
        // The deal threshold sits below the acceptance threshold, so early
        // rounds can never reject
        for spread in [0.0, 6.0, 6.4, 6.5, 24.0, 30.0] {
            assert_ne!(decide(spread, 80.0, false), Decision::Reject);
        }
    }

    #[test]
    fn test_settlement_parties() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);
        let steps = run_to_end(session, &seller, &buyer, &item, &mut FixedRandom::midpoint());
        let records = &steps.last().unwrap().settlements;

        assert_eq!(records[0].kind, SettlementKind::EscrowCreated);
        assert_eq!(records[0].from_party, "Shopper");
        assert_eq!(records[1].to_party, "Vendor");
        assert_eq!(records[0].amount, 68.1);
        assert_eq!(records[3].kind, SettlementKind::DealCompleted);
    }

    #[test]
    fn test_advance_terminal_session_fails() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);
        let steps = run_to_end(session, &seller, &buyer, &item, &mut FixedRandom::midpoint());
        let closed = steps.last().unwrap().session.clone();

        let result = NegotiationEngine::new().advance_round(
            &closed,
            &seller,
            &buyer,
            &item,
            &mut FixedRandom::midpoint(),
        );
        assert!(matches!(result, Err(MarketError::InvalidSessionState(_))));
    }

    #[test]
    fn test_advance_cancelled_session_fails() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let mut session = new_session(&seller, &buyer, &item, 8);
        session.cancel().unwrap();

        let result = NegotiationEngine::new().advance_round(
            &session,
            &seller,
            &buyer,
            &item,
            &mut FixedRandom::midpoint(),
        );
        assert!(matches!(result, Err(MarketError::InvalidSessionState(_))));
    }

    #[test]
    fn test_rejects_foreign_agents() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);
        let traits = AgentTraits::new(5, 5, 5, 5).unwrap();
        let stranger =
            AgentProfile::new(AgentID::new("other"), "Stranger", Role::Buyer, traits, 10.0).unwrap();
        let engine = NegotiationEngine::new();

        let result =
            engine.advance_round(&session, &seller, &stranger, &item, &mut FixedRandom::midpoint());
        assert!(matches!(result, Err(MarketError::AgentMismatch(_))));

        let result =
            engine.advance_round(&session, &buyer, &seller, &item, &mut FixedRandom::midpoint());
        assert!(matches!(result, Err(MarketError::AgentMismatch(_))));
    }

    #[test]
    fn test_dyn_random_source() {
        let (seller, buyer) = agents();
        let item = item(80.0, 100.0);
        let session = new_session(&seller, &buyer, &item, 8);
        let mut rng: Box<dyn RandomSource> = Box::new(SeededRandom::new(3));

        let step = NegotiationEngine::new()
            .advance_round(&session, &seller, &buyer, &item, rng.as_mut())
            .unwrap();
        assert_eq!(step.session.current_round(), 1);
    }
}
