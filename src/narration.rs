//! Optional text enrichment for round summaries
//!
//! A [`Narrator`] may be slow or unreliable (for example a remote language
//! model). [`narrate`] bounds it with a timeout and falls back to a
//! deterministic template, so narration never affects a round's outcome.

use crate::error::{MarketError, Result};
use crate::events::RoundSummary;
use futures::future::{self, BoxFuture};
use std::time::Duration;
use tracing::warn;

/// Produces display text for a round summary
pub trait Narrator: Send + Sync {
    fn narrate<'a>(&'a self, summary: &'a RoundSummary) -> BoxFuture<'a, Result<String>>;
}

/// Deterministic narrator built on [`template_line`]
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateNarrator;

impl Narrator for TemplateNarrator {
    fn narrate<'a>(&'a self, summary: &'a RoundSummary) -> BoxFuture<'a, Result<String>> {
        Box::pin(future::ready(Ok::<_, MarketError>(template_line(summary))))
    }
}

/// Fixed one-line rendering of a summary
pub fn template_line(summary: &RoundSummary) -> String {
    match summary {
        RoundSummary::NegotiationOpened { ask, bid } => {
            format!("Opening | Ask: {:.1} | Bid: {:.1}", ask, bid)
        }
        RoundSummary::NegotiationRound {
            round,
            max_rounds,
            ask,
            bid,
            spread,
        } => {
            let pct = if *ask > 0.0 { spread / ask * 100.0 } else { 0.0 };
            format!(
                "Round {}/{} | Ask: {:.1} | Bid: {:.1} | Spread: {:.1} ({:.1}%)",
                round + 1,
                max_rounds,
                ask,
                bid,
                spread,
                pct
            )
        }
        RoundSummary::DealReached { price, .. } => {
            format!("Deal reached at {:.1} | Escrow -> Transfer -> Complete", price)
        }
        RoundSummary::DealFailed { spread, .. } => {
            format!("Negotiation failed | Spread too wide: {:.1}", spread)
        }
        RoundSummary::AuctionOpened {
            max_rounds,
            buyers,
            highest,
        } => format!(
            "Battle round 1/{} | {} buyers competing | Highest bid: {:.1}",
            max_rounds, buyers, highest
        ),
        RoundSummary::AuctionRound {
            round,
            max_rounds,
            remaining,
            eliminated,
            highest,
        } => format!(
            "Round {}/{} | {} buyers remaining | Highest: {:.1} | {} eliminated",
            round + 1,
            max_rounds,
            remaining,
            highest,
            eliminated
        ),
        RoundSummary::AuctionWon {
            winner,
            price,
            last_standing: true,
            ..
        } => format!("Last buyer standing: {} wins at {:.1}", winner, price),
        RoundSummary::AuctionWon { winner, price, .. } => {
            format!("Battle royale winner: {} at {:.1}", winner, price)
        }
        RoundSummary::AuctionCancelled { .. } => "Battle cancelled | All buyers eliminated".to_string(),
        RoundSummary::Aborted { round } => format!("Session aborted at round {}", round),
    }
}

/// Render a summary, falling back to the template when the narrator errors
/// or runs past `timeout`
pub async fn narrate(narrator: &dyn Narrator, summary: &RoundSummary, timeout: Duration) -> String {
    match tokio::time::timeout(timeout, narrator.narrate(summary)).await {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "narration failed, using template");
            template_line(summary)
        }
        Err(_) => {
            let err = MarketError::NarrationTimeout(timeout.as_millis() as u64);
            warn!(error = %err, "narration failed, using template");
            template_line(summary)
        }
    }
}
