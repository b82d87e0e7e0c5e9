//! Skinfall engine server binary.

use clap::Parser;
use skinfall::api::{AppState, EngineServer};
use skinfall::clock::{Clock, SystemClock};
use skinfall::store::PersistenceStore;
use skinfall::types::{CaseTemplate, ItemTemplate, RarityTier};
use skinfall::{
    ChannelBroadcaster, ConfigLoader, EngineResult, LedgerService, MarketplaceExchange,
    MemoryStore, RoundCoordinator,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "skinfall")]
#[command(about = "Skinfall wagering and economy engine", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Override the server host
    #[arg(long)]
    host: Option<String>,

    /// Override the server port
    #[arg(long)]
    port: Option<u16>,

    /// Skip seeding the demo catalog and accounts
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skinfall=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);
    let broadcaster = Arc::new(ChannelBroadcaster::default());
    let ledger = Arc::new(LedgerService::new(store.clone(), config.bonus.clone()));

    if !args.no_seed {
        seed_catalog(store.as_ref()).await?;
        let demo = ledger.register("demo", clock.now()).await?;
        info!(account = %demo.id, "Seeded demo account");
    }

    let round = Arc::new(RoundCoordinator::new(
        config.round.clone(),
        clock.clone(),
        ledger.clone(),
        broadcaster.clone(),
    ));
    tokio::spawn(round.clone().run());

    let marketplace = Arc::new(MarketplaceExchange::new(
        store.clone(),
        ledger.clone(),
        broadcaster.clone(),
        clock.clone(),
        config.marketplace.clone(),
    ));

    let state = Arc::new(AppState {
        config,
        store,
        ledger,
        round,
        marketplace,
        broadcaster,
        clock,
    });

    EngineServer::new(state).run().await
}

/// Built-in catalog so a fresh server is playable without an importer.
async fn seed_catalog(store: &dyn PersistenceStore) -> EngineResult<()> {
    let definitions: [(&str, &str, f64, &[(&str, u8)]); 2] = [
        (
            "Scarlet Devil Case",
            "scarlet_devil.png",
            25.0,
            &[
                ("Maid Knife", 1),
                ("Broken Clock", 1),
                ("Tea Set", 2),
                ("Spear of the Gungnir", 3),
                ("Pocket Watch of Blood", 4),
                ("Gem of the Scarlet Moon", 5),
            ],
        ),
        (
            "Hakurei Shrine Case",
            "hakurei_shrine.png",
            50.0,
            &[
                ("Ofuda Paper", 1),
                ("Donation Box Coin", 1),
                ("Purification Rod", 2),
                ("Yin-Yang Orb", 3),
                ("Fantasy Seal", 4),
                ("Hakurei Amulet", 5),
            ],
        ),
    ];

    for (title, image, price, items) in definitions {
        let case_id = Uuid::new_v4();
        let case = CaseTemplate {
            id: case_id,
            title: title.to_string(),
            description: format!("{} item collection", title),
            image: image.to_string(),
            price,
            items: items
                .iter()
                .map(|(name, rarity)| ItemTemplate {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    image: format!("{}.png", name.to_lowercase().replace(' ', "_")),
                    rarity: RarityTier(*rarity),
                    case_id: Some(case_id),
                })
                .collect(),
        };
        store.insert_case(case).await?;
    }

    info!("Seeded demo catalog");
    Ok(())
}
