//! Agent Bazaar
//!
//! Simulation core for autonomous trading agents:
//! - Two-party price negotiation with alternating concessions
//! - Battle royale auctions with per-round buyer elimination
//! - Simulated settlement records for finished deals
//!
//! Engines are stateless. Each call consumes a session snapshot and returns
//! the next one, drawing randomness from an injected [`RandomSource`].

pub mod auction;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod narration;
pub mod negotiation;
pub mod random;
pub mod settlement;
pub mod types;

// Re-export commonly used types
pub use auction::{AuctionEngine, AuctionSession, AuctionStatus, AuctionStep, Bid};
pub use config::{AuctionRules, MarketConfig, NegotiationRules};
pub use error::{MarketError, Result};
pub use events::{RoundOutcome, RoundSummary};
pub use narration::{narrate, Narrator, TemplateNarrator};
pub use negotiation::{NegotiationEngine, NegotiationSession, NegotiationStatus, NegotiationStep};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use settlement::{SettlementKind, SettlementRecord, SettlementVenue};
pub use types::{AgentID, AgentProfile, AgentTraits, Item, ItemID, Role, SessionID, TxRef};
