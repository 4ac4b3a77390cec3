//! Battle royale: ascending multi-buyer auction with elimination

pub mod engine;
pub mod session;
pub mod types;

pub use engine::AuctionEngine;
pub use session::AuctionSession;
pub use types::{AuctionStatus, AuctionStep, Bid, BuyerStanding};
