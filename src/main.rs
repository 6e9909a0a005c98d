//! Vineyard - tap-to-earn rewards gateway for Telegram mini-apps
//!
//! "The last will be first, and the first will be last" - Matthew 20:16

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vineyard::{
    bot::{spawn_poller, TelegramClient},
    config::{Args, RewardConfig},
    db::MongoClient,
    engine::SystemClock,
    farming::FarmingSweeper,
    ledger::UserLedger,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vineyard={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Vineyard - Tap-to-Earn Gateway");
    info!("  \"The laborers in the vineyard\"");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Claim mode: {}", args.claim_mode.as_str());
    info!("Claim interval: {}s", args.claim_interval_secs);
    info!("Streak rewards: {}", args.streak_reward_mode.as_str());
    info!("Farming tick: {}s", args.farming_tick_secs);
    info!("======================================");

    // Connect to MongoDB - the ledger is the single source of truth,
    // so a gateway without it cannot serve
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            client
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    // Build the ledger (creates collection indexes)
    let reward_config = RewardConfig::from_args(&args);
    let ledger = match UserLedger::new(mongo, reward_config.clone()).await {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!("Failed to initialize user ledger: {}", e);
            std::process::exit(1);
        }
    };

    // Telegram bot client (optional in dev mode)
    let bot = match args.telegram_token {
        Some(ref token) => {
            info!("Telegram bot enabled (@{})", args.bot_username);
            Some(Arc::new(TelegramClient::new(token)))
        }
        None => {
            warn!("No TELEGRAM_TOKEN set, bot surface disabled (dev mode)");
            None
        }
    };

    // Create application state
    let state = Arc::new(server::AppState::new(
        args.clone(),
        reward_config,
        Arc::clone(&ledger),
        bot.clone(),
        Arc::new(SystemClock),
    ));

    // Start the farming accrual sweeper
    let sweeper = Arc::new(FarmingSweeper::new(
        Arc::clone(&ledger),
        Duration::from_secs(args.farming_tick_secs),
    ));
    Arc::clone(&sweeper).start().await;

    // Start the bot poller
    let _poller = bot.map(|client| {
        info!("Starting Telegram bot poller");
        spawn_poller(Arc::clone(&state), client)
    });

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
