//! Market configuration

use crate::error::{MarketError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for the bazaar
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Bilateral negotiation rules
    pub negotiation: NegotiationRules,
    /// Battle royale auction rules
    pub auction: AuctionRules,
    /// Upper bound on optional narration before falling back to templates
    pub narration_timeout_ms: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            negotiation: NegotiationRules::default(),
            auction: AuctionRules::default(),
            narration_timeout_ms: 1500,
        }
    }
}

/// Rules fixed at negotiation session creation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationRules {
    pub max_rounds: u32,
}

impl Default for NegotiationRules {
    fn default() -> Self {
        Self { max_rounds: 8 }
    }
}

/// Rules fixed at auction session creation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionRules {
    pub max_rounds: u32,
    pub min_buyers: usize,
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            min_buyers: 2,
        }
    }
}

impl MarketConfig {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MarketError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: MarketConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.negotiation.validate()?;
        self.auction.validate()?;
        if self.narration_timeout_ms == 0 {
            return Err(MarketError::InvalidConfig(
                "narration_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn narration_timeout(&self) -> Duration {
        Duration::from_millis(self.narration_timeout_ms)
    }
}

impl NegotiationRules {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds < 2 {
            return Err(MarketError::InvalidConfig(format!(
                "negotiation.max_rounds must be at least 2, got {}",
                self.max_rounds
            )));
        }
        Ok(())
    }
}

impl AuctionRules {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds < 2 {
            return Err(MarketError::InvalidConfig(format!(
                "auction.max_rounds must be at least 2, got {}",
                self.max_rounds
            )));
        }
        if self.min_buyers < 2 {
            return Err(MarketError::InvalidConfig(format!(
                "auction.min_buyers must be at least 2, got {}",
                self.min_buyers
            )));
        }
        Ok(())
    }
}
