//! Agent Bazaar CLI binary

use agent_bazaar::cli::{demo_buyers, demo_item, demo_seller, render_json, Cli, Commands, MarketApp};
use agent_bazaar::config::MarketConfig;
use agent_bazaar::random::{RandomSource, SeededRandom, ThreadRandom};
use clap::Parser;

fn random_source(seed: Option<u64>) -> Box<dyn RandomSource + Send> {
    match seed {
        Some(seed) => Box::new(SeededRandom::new(seed)),
        None => Box::new(ThreadRandom),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging on stderr; stdout carries only the JSON report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = MarketConfig::load(cli.config.as_deref())?;
    let app = MarketApp::new(config)?;

    let output = match cli.command {
        Commands::Negotiate {
            seed,
            price,
            base_price,
        } => {
            let seller = demo_seller()?;
            let buyer = demo_buyers(1)?.remove(0);
            let item = demo_item(price, base_price)?;
            let mut rng = random_source(seed);

            let report = app
                .run_negotiation(&seller, &buyer, &item, rng.as_mut())
                .await?;
            render_json(&report)?
        }

        Commands::Battle {
            seed,
            buyers,
            price,
            base_price,
        } => {
            let seller = demo_seller()?;
            let buyers = demo_buyers(buyers)?;
            let item = demo_item(price, base_price)?;
            let mut rng = random_source(seed);

            let report = app.run_battle(&seller, &buyers, &item, rng.as_mut()).await?;
            render_json(&report)?
        }

        Commands::Tournament { sessions, seed } => {
            tracing::info!("Running tournament of {} sessions (seed {})", sessions, seed);
            let summary = app.run_tournament(sessions, seed).await?;
            render_json(&summary)?
        }
    };

    println!("{}", output);
    Ok(())
}
