use clap::Parser;
use tally_core::{StoreBackend, TallyConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use tally_server::http;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "tally.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience, production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match TallyConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG directives take precedence over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.as_str()));
    fmt().with_env_filter(filter).init();

    if args.health {
        run_health_check(&config).await;
        return Ok(());
    }

    // Connect to the store
    let store = match tally_core::open_store(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open {:?} store: {}", config.database.backend, e);
            std::process::exit(1);
        }
    };
    tracing::info!(backend = store.name(), "Document store ready");

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(store, config, tx.subscribe()).await?;

    Ok(())
}

async fn run_health_check(config: &TallyConfig) {
    if config.database.backend == StoreBackend::Postgres {
        let pool = match tally_core::db::create_pool(&config.database).await {
            Ok(p) => p,
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        };
        match tally_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL query failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    let store = match tally_core::open_store(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            println!("❌ Document store unavailable: {}", e);
            std::process::exit(1);
        }
    };

    match store.list_collections().await {
        Ok(names) => println!("✅ {} store collections: [{}]", store.name(), names.join(", ")),
        Err(e) => {
            println!("❌ Listing collections failed: {}", e);
            std::process::exit(1);
        }
    }

    println!("✅ Tally health check passed");
}
