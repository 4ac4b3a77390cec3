//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agent-bazaar")]
#[command(about = "Agent Bazaar - simulated negotiations and battle royale auctions", long_about = None)]
pub struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one seller/buyer price negotiation
    Negotiate {
        /// Seed for reproducible runs (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Current market price of the item
        #[arg(short, long, default_value = "100.0")]
        price: f64,

        /// Reference base price of the item
        #[arg(short, long, default_value = "80.0")]
        base_price: f64,
    },

    /// Run a battle royale auction
    Battle {
        /// Seed for reproducible runs (random when omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of competing buyers
        #[arg(short = 'n', long, default_value = "3")]
        buyers: usize,

        /// Current market price of the item
        #[arg(short, long, default_value = "100.0")]
        price: f64,

        /// Reference base price of the item
        #[arg(short, long, default_value = "80.0")]
        base_price: f64,
    },

    /// Run many independent sessions concurrently and summarise them
    Tournament {
        /// Number of sessions of each kind
        #[arg(short = 'n', long, default_value = "10")]
        sessions: usize,

        /// Base seed; session i uses seed + i
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}
