//! Error types for the agent bazaar

use thiserror::Error;

/// Main error type for the agent bazaar
#[derive(Error, Debug)]
pub enum MarketError {
    // Session errors
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    #[error("Insufficient buyers: required {required}, available {available}")]
    InsufficientBuyers { required: usize, available: usize },

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Agent mismatch: {0}")]
    AgentMismatch(String),

    // Input validation errors
    #[error("Trait {trait_name} out of range [1, 10]: {value}")]
    InvalidTraitRange { trait_name: &'static str, value: u8 },

    #[error("Invalid price for {field}: {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // Narration errors (recovered locally, never returned by the engines)
    #[error("Narration failed: {0}")]
    NarrationFailed(String),

    #[error("Narration timed out after {0} ms")]
    NarrationTimeout(u64),

    // Driver errors
    #[error("Session task failed: {0}")]
    TaskFailed(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bazaar operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Reject negative, NaN or infinite prices.
pub(crate) fn ensure_price(field: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(MarketError::InvalidPrice { field, value })
    }
}
