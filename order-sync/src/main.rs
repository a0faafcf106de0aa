//! Order Sync Main Entry Point
//!
//! `order-sync sync` copies every order from PostgreSQL into the OpenSearch index.
//! `order-sync export` prints every order key matching a keyword filter.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use order_sync::exporter::ExportFilter;
use order_sync::{AppError, Dependencies};
use serde_json::json;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "order-sync")]
#[command(about = "Sync orders into the search index and export matching keys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy every source record into the search index.
    Sync,
    /// Print the keys of every indexed order matching a filter, as JSON.
    Export {
        /// Field to match the keyword against.
        #[arg(long, default_value = "orderNameXPwId")]
        field: String,

        /// Substring to look for (case- and accent-insensitive). Matches everything if omitted.
        #[arg(long)]
        keyword: Option<String>,

        /// Only orders of this seller.
        #[arg(long, env = "EXPORT_SELLER_ID")]
        seller_id: Option<String>,
    },
}

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("order_sync=info,order_sync_repository=info"));

    let json_format = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "order-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| AppError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "order-sync",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

fn export_filter(field: String, keyword: Option<String>, seller_id: Option<String>) -> ExportFilter {
    let mut filters = Vec::new();
    if let Some(keyword) = keyword.filter(|k| !k.trim().is_empty()) {
        filters.push(ExportFilter::Keyword { field, keyword });
    }
    if let Some(seller_id) = seller_id {
        filters.push(ExportFilter::Term {
            field: "sellerId".to_string(),
            value: seller_id,
        });
    }
    ExportFilter::All(filters)
}

async fn run(command: Command, deps: &Dependencies) -> Result<(), AppError> {
    match command {
        Command::Sync => {
            let progress = deps.sync_driver().run().await?;
            info!(
                synced = progress.synced,
                failed = progress.failed,
                total = progress.total_discovered,
                "Sync finished"
            );
        }
        Command::Export {
            field,
            keyword,
            seller_id,
        } => {
            let filter = export_filter(field, keyword, seller_id);
            let result = deps.exporter().export_all_keys(&filter).await;
            println!(
                "{}",
                json!({ "keys": result.keys, "total": result.total })
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    init_tracing()?;

    info!("Starting order sync");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    // Documents written before an interrupt remain valid upserts; a rerun starts over.
    let result = tokio::select! {
        result = run(cli.command, &deps) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    };
    deps.shutdown().await;

    match result {
        Ok(()) => {
            info!("Order sync completed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Order sync failed");
            Err(e)
        }
    }
}
