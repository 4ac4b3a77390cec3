//! Core types used throughout the bazaar

use crate::error::{ensure_price, MarketError, Result};
use blake2::{Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for negotiation and auction sessions
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionID(pub String);

impl SessionID {
    /// Generate a new random session ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Agent identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentID(pub String);

impl AgentID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AgentID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemID(pub String);

impl ItemID {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ItemID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synthetic transaction reference (`0x`-prefixed Blake2b-256 hex)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef(pub String);

impl TxRef {
    /// Derive a reference by hashing the given parts in order
    pub fn derive(parts: &[&[u8]]) -> Self {
        let digest = blake2b_256(parts);
        Self(format!("0x{}", hex::encode(digest)))
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blake2b digest truncated to 32 bytes
pub(crate) fn blake2b_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result[..32]);
    hash
}

/// Side an agent trades on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Seller,
    Buyer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Seller => write!(f, "seller"),
            Role::Buyer => write!(f, "buyer"),
        }
    }
}

/// Personality traits driving an agent's pricing behaviour.
///
/// Every trait is an integer in `[1, 10]`, checked once at construction.
/// The engines only ever read these values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTraits")]
pub struct AgentTraits {
    aggressiveness: u8,
    patience: u8,
    flexibility: u8,
    risk_tolerance: u8,
}

#[derive(Deserialize)]
struct RawTraits {
    aggressiveness: u8,
    patience: u8,
    flexibility: u8,
    risk_tolerance: u8,
}

impl TryFrom<RawTraits> for AgentTraits {
    type Error = MarketError;

    fn try_from(raw: RawTraits) -> Result<Self> {
        AgentTraits::new(
            raw.aggressiveness,
            raw.patience,
            raw.flexibility,
            raw.risk_tolerance,
        )
    }
}

impl AgentTraits {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(aggressiveness: u8, patience: u8, flexibility: u8, risk_tolerance: u8) -> Result<Self> {
        for (trait_name, value) in [
            ("aggressiveness", aggressiveness),
            ("patience", patience),
            ("flexibility", flexibility),
            ("risk_tolerance", risk_tolerance),
        ] {
            if !(Self::MIN..=Self::MAX).contains(&value) {
                return Err(MarketError::InvalidTraitRange { trait_name, value });
            }
        }

        Ok(Self {
            aggressiveness,
            patience,
            flexibility,
            risk_tolerance,
        })
    }

    pub fn aggressiveness(&self) -> u8 {
        self.aggressiveness
    }

    pub fn patience(&self) -> u8 {
        self.patience
    }

    pub fn flexibility(&self) -> u8 {
        self.flexibility
    }

    pub fn risk_tolerance(&self) -> u8 {
        self.risk_tolerance
    }
}

/// An autonomous trading agent: identity, side, traits and spending cap
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct AgentProfile {
    id: AgentID,
    name: String,
    role: Role,
    traits: AgentTraits,
    balance: f64,
}

#[derive(Deserialize)]
struct RawProfile {
    id: AgentID,
    name: String,
    role: Role,
    traits: AgentTraits,
    balance: f64,
}

impl TryFrom<RawProfile> for AgentProfile {
    type Error = MarketError;

    fn try_from(raw: RawProfile) -> Result<Self> {
        AgentProfile::new(raw.id, raw.name, raw.role, raw.traits, raw.balance)
    }
}

impl AgentProfile {
    pub fn new(
        id: AgentID,
        name: impl Into<String>,
        role: Role,
        traits: AgentTraits,
        balance: f64,
    ) -> Result<Self> {
        let balance = ensure_price("balance", balance)?;
        Ok(Self {
            id,
            name: name.into(),
            role,
            traits,
            balance,
        })
    }

    pub fn id(&self) -> &AgentID {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn traits(&self) -> &AgentTraits {
        &self.traits
    }

    /// Upper bound on total spend (meaningful for buyers)
    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub(crate) fn expect_role(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(MarketError::AgentMismatch(format!(
                "agent {} is a {}, expected a {}",
                self.id, self.role, role
            )))
        }
    }
}

/// The tradeable item. Prices are fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawItem")]
pub struct Item {
    id: ItemID,
    name: String,
    base_price: f64,
    current_price: f64,
}

#[derive(Deserialize)]
struct RawItem {
    id: ItemID,
    name: String,
    base_price: f64,
    current_price: f64,
}

impl TryFrom<RawItem> for Item {
    type Error = MarketError;

    fn try_from(raw: RawItem) -> Result<Self> {
        Item::new(raw.id, raw.name, raw.base_price, raw.current_price)
    }
}

impl Item {
    pub fn new(
        id: ItemID,
        name: impl Into<String>,
        base_price: f64,
        current_price: f64,
    ) -> Result<Self> {
        let base_price = ensure_price("base_price", base_price)?;
        let current_price = ensure_price("current_price", current_price)?;
        if base_price == 0.0 {
            return Err(MarketError::InvalidPrice {
                field: "base_price",
                value: base_price,
            });
        }
        if current_price == 0.0 {
            return Err(MarketError::InvalidPrice {
                field: "current_price",
                value: current_price,
            });
        }

        Ok(Self {
            id,
            name: name.into(),
            base_price,
            current_price,
        })
    }

    pub fn id(&self) -> &ItemID {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference floor used by the deal thresholds
    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    /// Anchor for opening offers
    pub fn current_price(&self) -> f64 {
        self.current_price
    }
}

/// Round to one decimal place
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_generation() {
        let id1 = SessionID::generate();
        let id2 = SessionID::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.0.len(), 36);
    }

    #[test]
    fn test_tx_ref_deterministic() {
        let a = TxRef::derive(&[b"session", b"escrow_created"]);
        let b = TxRef::derive(&[b"session", b"escrow_created"]);
        let c = TxRef::derive(&[b"session", b"payment_sent"]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.0.starts_with("0x"));
        assert_eq!(a.0.len(), 2 + 64);
    }

    #[test]
    fn test_traits_in_range() {
        let traits = AgentTraits::new(1, 5, 10, 7).unwrap();
        assert_eq!(traits.aggressiveness(), 1);
        assert_eq!(traits.patience(), 5);
        assert_eq!(traits.flexibility(), 10);
        assert_eq!(traits.risk_tolerance(), 7);
    }

    #[test]
    fn test_traits_out_of_range() {
        let err = AgentTraits::new(0, 5, 5, 5).unwrap_err();
        assert!(matches!(
            err,
            MarketError::InvalidTraitRange {
                trait_name: "aggressiveness",
                value: 0
            }
        ));

        let err = AgentTraits::new(5, 5, 5, 11).unwrap_err();
        assert!(matches!(
            err,
            MarketError::InvalidTraitRange {
                trait_name: "risk_tolerance",
                value: 11
            }
        ));
    }

    #[test]
    fn test_traits_deserialization_validates() {
        let ok: AgentTraits = serde_json::from_str(
            r#"{"aggressiveness":3,"patience":4,"flexibility":5,"risk_tolerance":6}"#,
        )
        .unwrap();
        assert_eq!(ok.flexibility(), 5);

        let bad = serde_json::from_str::<AgentTraits>(
            r#"{"aggressiveness":3,"patience":40,"flexibility":5,"risk_tolerance":6}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_profile_rejects_bad_balance() {
        let traits = AgentTraits::new(5, 5, 5, 5).unwrap();
        let err = AgentProfile::new(AgentID::new("b1"), "Bob", Role::Buyer, traits, -1.0).unwrap_err();
        assert!(matches!(err, MarketError::InvalidPrice { field: "balance", .. }));

        let err =
            AgentProfile::new(AgentID::new("b1"), "Bob", Role::Buyer, traits, f64::NAN).unwrap_err();
        assert!(matches!(err, MarketError::InvalidPrice { .. }));
    }

    #[test]
    fn test_item_validation() {
        assert!(Item::new(ItemID::new("i"), "Orb", 80.0, 100.0).is_ok());
        assert!(Item::new(ItemID::new("i"), "Orb", 0.0, 100.0).is_err());
        assert!(Item::new(ItemID::new("i"), "Orb", 80.0, -5.0).is_err());
        assert!(Item::new(ItemID::new("i"), "Orb", f64::NAN, 100.0).is_err());
    }

    #[test]
    fn test_profile_serialization() {
        let traits = AgentTraits::new(9, 2, 3, 8).unwrap();
        let profile =
            AgentProfile::new(AgentID::new("b1"), "Bob", Role::Buyer, traits, 250.0).unwrap();

        let serialized = serde_json::to_string(&profile).unwrap();
        assert!(serialized.contains("\"role\":\"buyer\""));
        let deserialized: AgentProfile = serde_json::from_str(&serialized).unwrap();
        assert_eq!(profile, deserialized);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(44.625), 44.6);
        assert_eq!(round1(70.44), 70.4);
        assert_eq!(round1(70.45000001), 70.5);
    }
}
