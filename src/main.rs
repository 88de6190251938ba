use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use futures::StreamExt;
use gara_stock::config::Config;
use gara_stock::qr::QrGenerator;
use gara_stock::storage::{self, SeedOutcome};
use gara_stock::{catalog, logging, web, ItemEvent, StockService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "gara-stock", about = "Inventory tracking with QR-coded items")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Load a catalog feed (JSON array, wrapped list or JSON Lines).
    ImportCatalog { json_file: PathBuf },
    /// Create or rename the default categories.
    SeedCategories,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env();
    logging::init(&config.log_level);

    let db = storage::connect(config.database_url()?, config.db_max_connections).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::ImportCatalog { json_file } => {
            let summary = catalog::import_feed_file(&db, &json_file).await?;
            println!(
                "Created: {}, updated: {}, skipped: {}",
                summary.created, summary.updated, summary.skipped
            );
            Ok(())
        }
        Command::SeedCategories => {
            for (code, outcome) in storage::seed_default_categories(&db).await? {
                match outcome {
                    SeedOutcome::Created => println!("Created category {code}"),
                    SeedOutcome::Renamed => println!("Renamed category {code}"),
                    SeedOutcome::Unchanged => println!("Category {code} already exists"),
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config, db: sea_orm::DatabaseConnection) -> Result<()> {
    let qr = QrGenerator::new(config.qr_base_url());
    info!(base_url = qr.base_url(), "QR codes will point at this address");
    let service = Arc::new(StockService::new(db, qr));

    let mut events = service.subscribe();
    tokio::spawn(async move {
        while let Some(Ok(event)) = events.next().await {
            match event {
                ItemEvent::Created(item) => debug!(code = %item.code, "item created"),
                ItemEvent::Updated(item) => debug!(code = %item.code, "item updated"),
                ItemEvent::Deleted(code) => debug!(%code, "item deleted"),
            }
        }
    });

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "listening");
    axum::serve(listener, web::router(service)).await?;
    Ok(())
}
