use clap::Parser;
use specimen_core::config::{StoreBackend, DEFAULT_CONFIG_PATH};
use specimen_core::SpecimenConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use specimen_server::http::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Check store connectivity and exit
    #[arg(long)]
    health: bool,

    /// Create the predictions table and exit
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match SpecimenConfig::load(Some(&args.config)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.migrate {
        if config.store.backend != StoreBackend::Postgres {
            eprintln!("--migrate needs store.backend = \"postgres\"");
            std::process::exit(1);
        }
        let pool = match specimen_core::db::create_pool(&config.database).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        };
        specimen_core::db::run_migrations(&pool).await?;
        println!("✅ predictions schema is up to date");
        return Ok(());
    }

    let state = match AppState::from_config(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialise serving state: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match state.store.ping().await {
            Ok(v) => println!("✅ {} store reachable: {}", state.store.name(), v),
            Err(e) => {
                println!("❌ {} store check failed: {}", state.store.name(), e);
                std::process::exit(1);
            }
        }
        println!("✅ Predictor ready: {}", state.predictor.name());
        return Ok(());
    }

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

    http::start_http_server(state, &config.http, tx.subscribe()).await?;

    Ok(())
}
