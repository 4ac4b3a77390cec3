//! CLI module for Agent Bazaar

pub mod app;
pub mod commands;

pub use app::{
    demo_buyers, demo_item, demo_seller, render_json, BattleReport, MarketApp, NegotiationReport,
    TournamentSummary,
};
pub use commands::{Cli, Commands};
