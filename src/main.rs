// ABOUTME: Entry point for the cassncase binary.
// ABOUTME: Parses CLI arguments, initializes tracing, opens the order ledger, and serves or runs a one-shot command.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cassncase_server::{AppConfig, AppState, create_router};
use cassncase_store::{BuiltinSeed, JsonSeedFile, NoSeed, OrderLedger, SeedSource};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cassncase", about = "Order confirmation ledger", version)]
struct Cli {
    /// Database file, overriding CASSNCASE_DB
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Do not seed an empty store
    #[arg(long, global = true)]
    no_seed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Listen address, overriding CASSNCASE_BIND
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print the computed state of the order matching an email, phone, or order id
    Lookup { query: String },
    /// Compare every master record with its log and print the report
    Audit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cassncase=debug,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if cli.no_seed {
        config.seed = false;
    }

    let ledger = open_ledger(&config).await?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(ledger, bind.unwrap_or(config.bind)).await,
        Command::Lookup { query } => {
            match ledger.search(&query).await? {
                Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
                None => println!("no order matches {:?}", query),
            }
            Ok(())
        }
        Command::Audit => {
            let report = ledger.audit().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn open_ledger(config: &AppConfig) -> anyhow::Result<OrderLedger> {
    std::fs::create_dir_all(&config.home)
        .with_context(|| format!("creating data directory {}", config.home.display()))?;
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }

    let seed: Box<dyn SeedSource> = match (&config.seed_file, config.seed) {
        (_, false) => Box::new(NoSeed),
        (Some(path), true) => Box::new(JsonSeedFile::new(path.clone())),
        (None, true) => Box::new(BuiltinSeed),
    };
    tracing::debug!("seed source: {}", seed.name());

    let ledger = OrderLedger::open(&config.db_path, seed.as_ref()).await?;
    tracing::info!("order ledger open at {}", config.db_path.display());
    Ok(ledger)
}

async fn serve(ledger: OrderLedger, bind: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(Arc::new(AppState::new(ledger)));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    tracing::info!("cassncase listening on {}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
