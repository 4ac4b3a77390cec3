//! Driver that owns sessions and advances them to completion

use crate::auction::{AuctionEngine, AuctionSession};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::events::RoundOutcome;
use crate::narration::{narrate, Narrator, TemplateNarrator};
use crate::negotiation::{NegotiationEngine, NegotiationSession};
use crate::random::{RandomSource, SeededRandom};
use crate::settlement::SettlementRecord;
use crate::types::{AgentID, AgentProfile, AgentTraits, Item, ItemID, Role};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

/// Finished negotiation with its rendered transcript
#[derive(Clone, Debug, Serialize)]
pub struct NegotiationReport {
    pub session: NegotiationSession,
    pub outcome: RoundOutcome,
    pub transcript: Vec<String>,
    pub settlements: Vec<SettlementRecord>,
}

/// Finished auction with its rendered transcript
#[derive(Clone, Debug, Serialize)]
pub struct BattleReport {
    pub session: AuctionSession,
    pub outcome: RoundOutcome,
    pub transcript: Vec<String>,
    pub settlements: Vec<SettlementRecord>,
}

/// Aggregate over a tournament of independent sessions
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TournamentSummary {
    pub negotiations: usize,
    pub deals: usize,
    pub failed: usize,
    pub battles: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub average_deal_price: Option<f64>,
    pub average_winning_price: Option<f64>,
}

/// Main bazaar application
#[derive(Clone)]
pub struct MarketApp {
    config: Arc<MarketConfig>,
    negotiation: NegotiationEngine,
    auction: AuctionEngine,
    narrator: Arc<dyn Narrator>,
}

impl MarketApp {
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            negotiation: NegotiationEngine::new(),
            auction: AuctionEngine::new(),
            narrator: Arc::new(TemplateNarrator),
        })
    }

    /// Replace the default template narrator
    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// Run a negotiation from creation to its terminal round
    pub async fn run_negotiation(
        &self,
        seller: &AgentProfile,
        buyer: &AgentProfile,
        item: &Item,
        rng: &mut (dyn RandomSource + Send),
    ) -> Result<NegotiationReport> {
        let mut session = NegotiationSession::new(seller, buyer, item, &self.config.negotiation)?;
        tracing::info!(
            session = %session.id(),
            seller = %seller.id(),
            buyer = %buyer.id(),
            item = %item.id(),
            "negotiation started"
        );

        let mut transcript = Vec::new();
        loop {
            let step = self
                .negotiation
                .advance_round(&session, seller, buyer, item, rng)?;
            transcript.push(self.render(&step.summary).await);
            session = step.session;

            if step.outcome.is_terminal() {
                return Ok(NegotiationReport {
                    session,
                    outcome: step.outcome,
                    transcript,
                    settlements: step.settlements,
                });
            }
        }
    }

    /// Run a battle royale from creation to its terminal round
    pub async fn run_battle(
        &self,
        seller: &AgentProfile,
        buyers: &[AgentProfile],
        item: &Item,
        rng: &mut (dyn RandomSource + Send),
    ) -> Result<BattleReport> {
        let mut session = AuctionSession::new(seller, buyers, item, &self.config.auction)?;
        tracing::info!(
            session = %session.id(),
            buyers = buyers.len(),
            item = %item.id(),
            "battle started"
        );

        let mut transcript = Vec::new();
        loop {
            let step = self
                .auction
                .advance_round(&session, seller, buyers, item, rng)?;
            transcript.push(self.render(&step.summary).await);
            session = step.session;

            if step.outcome.is_terminal() {
                return Ok(BattleReport {
                    session,
                    outcome: step.outcome,
                    transcript,
                    settlements: step.settlements,
                });
            }
        }
    }

    /// Run `sessions` negotiations and `sessions` battles concurrently.
    ///
    /// Each session gets its own seeded generator, so the summary depends
    /// only on `seed`.
    pub async fn run_tournament(&self, sessions: usize, seed: u64) -> Result<TournamentSummary> {
        let item = demo_item(100.0, 80.0)?;
        let seller = demo_seller()?;
        let buyers = demo_buyers(4)?;

        let negotiations = (0..sessions).map(|i| {
            let app = self.clone();
            let (seller, buyer, item) = (seller.clone(), buyers[i % buyers.len()].clone(), item.clone());
            tokio::spawn(async move {
                let mut rng = SeededRandom::new(seed.wrapping_add(i as u64));
                app.run_negotiation(&seller, &buyer, &item, &mut rng).await
            })
        });
        let battles = (0..sessions).map(|i| {
            let app = self.clone();
            let (seller, buyers, item) = (seller.clone(), buyers.clone(), item.clone());
            tokio::spawn(async move {
                let mut rng = SeededRandom::new(seed.wrapping_add(i as u64));
                app.run_battle(&seller, &buyers, &item, &mut rng).await
            })
        });

        let (negotiations, battles) = futures::join!(join_all(negotiations), join_all(battles));

        let mut summary = TournamentSummary::default();
        let mut deal_prices = Vec::new();
        for handle in negotiations {
            let report = handle.map_err(task_failed)??;
            summary.negotiations += 1;
            match report.session.final_price() {
                Some(price) => {
                    summary.deals += 1;
                    deal_prices.push(price);
                }
                None => summary.failed += 1,
            }
        }

        let mut winning_prices = Vec::new();
        for handle in battles {
            let report = handle.map_err(task_failed)??;
            summary.battles += 1;
            match report.session.winning_price() {
                Some(price) => {
                    summary.completed += 1;
                    winning_prices.push(price);
                }
                None => summary.cancelled += 1,
            }
        }

        summary.average_deal_price = average(&deal_prices);
        summary.average_winning_price = average(&winning_prices);
        tracing::info!(?summary, "tournament finished");
        Ok(summary)
    }

    async fn render(&self, summary: &crate::events::RoundSummary) -> String {
        let line = narrate(self.narrator.as_ref(), summary, self.config.narration_timeout()).await;
        tracing::info!("{}", line);
        line
    }
}

/// Pretty JSON for a report or summary, as printed on stdout
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn task_failed(err: tokio::task::JoinError) -> MarketError {
    MarketError::TaskFailed(err.to_string())
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Seller used by the CLI scenarios
pub fn demo_seller() -> Result<AgentProfile> {
    AgentProfile::new(
        AgentID::new("seller_deal_maker"),
        "Deal Maker",
        Role::Seller,
        AgentTraits::new(6, 5, 5, 4)?,
        0.0,
    )
}

/// Buyers used by the CLI scenarios, cycling through a fixed cast
pub fn demo_buyers(count: usize) -> Result<Vec<AgentProfile>> {
    const CAST: [(&str, u8, u8, u8, u8, f64); 6] = [
        ("Byte Hunter", 9, 3, 4, 8, 150.0),
        ("Penny Pincher", 3, 8, 3, 3, 90.0),
        ("Whale Watcher", 7, 5, 6, 9, 250.0),
        ("Steady Hand", 5, 6, 5, 5, 120.0),
        ("Rookie Flipper", 2, 4, 8, 6, 80.0),
        ("Night Owl", 6, 7, 4, 7, 110.0),
    ];

    (0..count)
        .map(|i| {
            let (name, aggressiveness, patience, flexibility, risk, balance) = CAST[i % CAST.len()];
            let round = i / CAST.len();
            let (id, name) = if round == 0 {
                (format!("buyer_{}", i), name.to_string())
            } else {
                (format!("buyer_{}", i), format!("{} {}", name, round + 1))
            };
            AgentProfile::new(
                AgentID::new(id),
                name,
                Role::Buyer,
                AgentTraits::new(aggressiveness, patience, flexibility, risk)?,
                balance,
            )
        })
        .collect()
}

/// Item used by the CLI scenarios
pub fn demo_item(current_price: f64, base_price: f64) -> Result<Item> {
    Item::new(ItemID::new("item_cyber_relic"), "Cyber Relic", base_price, current_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RoundSummary;
    use crate::random::FixedRandom;
    use futures::future::BoxFuture;

    #[tokio::test]
    async fn test_run_negotiation() {
        let app = MarketApp::new(MarketConfig::default()).unwrap();
        let seller = demo_seller().unwrap();
        let buyer = demo_buyers(1).unwrap().remove(0);
        let item = demo_item(100.0, 80.0).unwrap();

        let report = app
            .run_negotiation(&seller, &buyer, &item, &mut FixedRandom::midpoint())
            .await
            .unwrap();

        assert_eq!(report.outcome, RoundOutcome::DealReached);
        assert_eq!(report.session.final_price(), Some(68.1));
        assert_eq!(report.transcript.len(), 7);
        assert!(report.transcript[0].starts_with("Opening"));
        assert_eq!(report.settlements.len(), 4);
    }

    #[tokio::test]
    async fn test_run_battle() {
        let app = MarketApp::new(MarketConfig::default()).unwrap();
        let seller = demo_seller().unwrap();
        let buyers = demo_buyers(3).unwrap();
        let item = demo_item(100.0, 80.0).unwrap();

        let report = app
            .run_battle(&seller, &buyers, &item, &mut SeededRandom::new(11))
            .await
            .unwrap();

        assert!(report.session.is_terminal());
        assert!(report.transcript.len() <= 5);
        match report.outcome {
            RoundOutcome::Completed => assert_eq!(report.settlements.len(), 4),
            RoundOutcome::Cancelled => assert!(report.settlements.is_empty()),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_battle_needs_two_buyers() {
        let app = MarketApp::new(MarketConfig::default()).unwrap();
        let seller = demo_seller().unwrap();
        let buyers = demo_buyers(1).unwrap();
        let item = demo_item(100.0, 80.0).unwrap();

        let result = app
            .run_battle(&seller, &buyers, &item, &mut FixedRandom::midpoint())
            .await;
        assert!(matches!(result, Err(MarketError::InsufficientBuyers { .. })));
    }

    #[tokio::test]
    async fn test_tournament_is_reproducible() {
        let app = MarketApp::new(MarketConfig::default()).unwrap();

        let first = app.run_tournament(6, 99).await.unwrap();
        let second = app.run_tournament(6, 99).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.negotiations, 6);
        assert_eq!(first.battles, 6);
        assert_eq!(first.deals + first.failed, 6);
        assert_eq!(first.completed + first.cancelled, 6);
    }

    struct Broken;

    impl Narrator for Broken {
        fn narrate<'a>(&'a self, _summary: &'a RoundSummary) -> BoxFuture<'a, Result<String>> {
            Box::pin(async { Err::<String, _>(MarketError::NarrationFailed("offline".to_string())) })
        }
    }

    #[tokio::test]
    async fn test_broken_narrator_does_not_change_outcome() {
        let seller = demo_seller().unwrap();
        let buyer = demo_buyers(1).unwrap().remove(0);
        let item = demo_item(100.0, 80.0).unwrap();

        let plain = MarketApp::new(MarketConfig::default()).unwrap();
        let broken = MarketApp::new(MarketConfig::default())
            .unwrap()
            .with_narrator(Arc::new(Broken));

        let a = plain
            .run_negotiation(&seller, &buyer, &item, &mut FixedRandom::midpoint())
            .await
            .unwrap();
        let b = broken
            .run_negotiation(&seller, &buyer, &item, &mut FixedRandom::midpoint())
            .await
            .unwrap();

        assert_eq!(a.session.final_price(), b.session.final_price());
        assert_eq!(a.transcript, b.transcript);
    }

    #[tokio::test]
    async fn test_report_json_parses_back() {
        let app = MarketApp::new(MarketConfig::default()).unwrap();
        let seller = demo_seller().unwrap();
        let buyer = demo_buyers(1).unwrap().remove(0);
        let item = demo_item(100.0, 80.0).unwrap();

        let report = app
            .run_negotiation(&seller, &buyer, &item, &mut FixedRandom::midpoint())
            .await
            .unwrap();
        let json = render_json(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["outcome"], "deal_reached");
        assert_eq!(value["settlements"].as_array().unwrap().len(), 4);
        assert_eq!(value["transcript"].as_array().unwrap().len(), 7);

        let session: NegotiationSession = serde_json::from_value(value["session"].clone()).unwrap();
        assert_eq!(session.id(), report.session.id());
        assert_eq!(session.final_price(), Some(68.1));
    }

    #[tokio::test]
    async fn test_panicked_task_maps_to_task_failed() {
        let handle: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("boom") });
        let err = handle.await.map_err(task_failed).unwrap_err();
        assert!(matches!(err, MarketError::TaskFailed(_)));
    }

    #[test]
    fn test_demo_cast_cycles() {
        let buyers = demo_buyers(8).unwrap();
        assert_eq!(buyers.len(), 8);
        assert_eq!(buyers[6].name(), "Byte Hunter 2");
        assert_ne!(buyers[0].id(), buyers[6].id());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = MarketConfig::default();
        config.auction.max_rounds = 0;
        assert!(MarketApp::new(config).is_err());
    }
}
