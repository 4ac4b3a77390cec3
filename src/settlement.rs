//! Synthetic settlement records emitted when a session closes
//!
//! The records are a cosmetic audit trail. Nothing is moved: the only
//! guarantees are record count, ordering by block sequence and unique ids.

use crate::error::{ensure_price, Result};
use crate::types::{blake2b_256, AgentProfile, Item, ItemID, SessionID, TxRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const BLOCK_BASE: u64 = 18_000_000;
const BLOCK_SPREAD: u64 = 100_000;
const MARKETPLACE: &str = "Marketplace";

/// Step of a simulated transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementKind {
    EscrowCreated,
    PaymentSent,
    ItemTransferred,
    DealCompleted,
    DealCancelled,
}

impl SettlementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementKind::EscrowCreated => "escrow_created",
            SettlementKind::PaymentSent => "payment_sent",
            SettlementKind::ItemTransferred => "item_transferred",
            SettlementKind::DealCompleted => "deal_completed",
            SettlementKind::DealCancelled => "deal_cancelled",
        }
    }
}

impl fmt::Display for SettlementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Confirmed,
}

/// Which protocol closed the session; picks the party labels and gas figures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementVenue {
    Negotiation,
    BattleRoyale,
}

impl SettlementVenue {
    pub fn escrow_label(&self) -> &'static str {
        match self {
            SettlementVenue::Negotiation => "Escrow Contract",
            SettlementVenue::BattleRoyale => "Battle Escrow",
        }
    }

    pub fn protocol_label(&self) -> &'static str {
        match self {
            SettlementVenue::Negotiation => "Negotiation Protocol",
            SettlementVenue::BattleRoyale => "Battle Royale Protocol",
        }
    }

    fn gas(&self, kind: SettlementKind) -> u64 {
        match (self, kind) {
            (SettlementVenue::Negotiation, SettlementKind::EscrowCreated) => 45_000,
            (SettlementVenue::BattleRoyale, SettlementKind::EscrowCreated) => 55_000,
            (_, SettlementKind::PaymentSent) => 21_000,
            (_, SettlementKind::ItemTransferred) => 65_000,
            (_, SettlementKind::DealCompleted) => 35_000,
            (_, SettlementKind::DealCancelled) => 21_000,
        }
    }
}

/// One entry of the synthetic audit trail
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: String,
    pub session_id: SessionID,
    pub kind: SettlementKind,
    pub from_party: String,
    pub to_party: String,
    pub amount: f64,
    pub item_id: ItemID,
    pub tx_ref: TxRef,
    pub block_seq: u64,
    pub status: RecordStatus,
    pub gas_figure: u64,
}

/// Emit the four-step success chain: escrow, payment, transfer, completion.
///
/// `payer` is the buyer funding the escrow, `payee` the seller receiving it.
pub fn emit_success(
    session_id: &SessionID,
    item: &Item,
    venue: SettlementVenue,
    payer: &AgentProfile,
    payee: &AgentProfile,
    price: f64,
) -> Result<Vec<SettlementRecord>> {
    let price = ensure_price("settlement_price", price)?;
    let escrow = venue.escrow_label();

    let steps = [
        (SettlementKind::EscrowCreated, payer.name(), escrow, price),
        (SettlementKind::PaymentSent, escrow, payee.name(), price),
        (SettlementKind::ItemTransferred, payee.name(), payer.name(), 0.0),
        (
            SettlementKind::DealCompleted,
            venue.protocol_label(),
            MARKETPLACE,
            price,
        ),
    ];

    let base = block_base(session_id);
    let records = steps
        .into_iter()
        .enumerate()
        .map(|(offset, (kind, from, to, amount))| {
            record(session_id, item, venue, kind, from, to, amount, base + offset as u64)
        })
        .collect();

    Ok(records)
}

/// Emit the single cancellation record for a failed session
pub fn emit_failure(
    session_id: &SessionID,
    item: &Item,
    venue: SettlementVenue,
) -> Vec<SettlementRecord> {
    vec![record(
        session_id,
        item,
        venue,
        SettlementKind::DealCancelled,
        venue.protocol_label(),
        MARKETPLACE,
        0.0,
        block_base(session_id),
    )]
}

#[allow(clippy::too_many_arguments)]
fn record(
    session_id: &SessionID,
    item: &Item,
    venue: SettlementVenue,
    kind: SettlementKind,
    from: &str,
    to: &str,
    amount: f64,
    block_seq: u64,
) -> SettlementRecord {
    let tx_ref = TxRef::derive(&[
        session_id.0.as_bytes(),
        kind.as_str().as_bytes(),
        &block_seq.to_be_bytes(),
    ]);

    SettlementRecord {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.clone(),
        kind,
        from_party: from.to_string(),
        to_party: to.to_string(),
        amount,
        item_id: item.id().clone(),
        tx_ref,
        block_seq,
        status: RecordStatus::Confirmed,
        gas_figure: venue.gas(kind),
    }
}

/// First block of a session's chain, stable per session id
fn block_base(session_id: &SessionID) -> u64 {
    let digest = blake2b_256(&[session_id.0.as_bytes()]);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    BLOCK_BASE + u64::from_be_bytes(prefix) % BLOCK_SPREAD
}
