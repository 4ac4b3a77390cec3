//! Bilateral price negotiation between one seller and one buyer

pub mod engine;
pub mod session;
pub mod types;

pub use engine::{decide, Decision, NegotiationEngine};
pub use session::NegotiationSession;
pub use types::{NegotiationStatus, NegotiationStep};
