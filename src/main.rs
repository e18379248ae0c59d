#![allow(missing_docs)]

//! Courier admin CLI.
//!
//! One-shot administrative entry points over the relay database: schema
//! initialisation, row-count status, and servicechain inspection. The
//! dispatch worker that drives message lifecycles is a separate process
//! consuming this crate as a library.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use courier::relay::{chain, contact};
use courier::{config, db, logging};

#[derive(Parser)]
#[command(name = "courier", version, about = "Messaging-relay persistence core")]
struct Cli {
    /// Path to config.toml (default: ~/.courier/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the relay database and apply the schema.
    Init,
    /// Print row counts for every relay table.
    Status,
    /// Print a servicechain's services in attempt order.
    Chain {
        /// Servicechain ID.
        id: i64,
    },
    /// Search contacts by first name or surname.
    Contacts {
        /// Case-insensitive substring to match.
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => config::config_dir()?.join("config.toml"),
    };
    let config = config::load_config(&config_path).context("failed to load configuration")?;

    match cli.command {
        Command::Init => {
            if let Some(parent) = config.database.path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
            let pool = db::connect(&config.database.path)
                .await
                .context("failed to open relay database")?;
            pool.close().await;
            info!(path = %config.database.path.display(), "relay database initialised");
            println!("initialised {}", config.database.path.display());
        }
        Command::Status => {
            let pool = db::connect(&config.database.path)
                .await
                .context("failed to open relay database")?;
            let mut counts = serde_json::Map::new();
            for table in [
                "organizations",
                "users",
                "contacts",
                "services",
                "servicechains",
                "services_in_sc",
                "blasts",
                "messages",
            ] {
                let row: (i64,) = sqlx::query_as(&format!("SELECT count(*) FROM {table}"))
                    .fetch_one(&pool)
                    .await
                    .with_context(|| format!("failed to count {table}"))?;
                counts.insert(table.to_owned(), serde_json::json!(row.0));
            }
            pool.close().await;
            println!("{}", serde_json::Value::Object(counts));
        }
        Command::Chain { id } => {
            let pool = db::connect(&config.database.path)
                .await
                .context("failed to open relay database")?;
            let sc = chain::load_servicechain(&pool, id).await?;
            let services = chain::servicechain_order(&pool, id).await?;
            pool.close().await;
            println!("servicechain {} ({})", id, sc.name);
            for service in services {
                println!(
                    "  {} [{}] initialized={}",
                    service.name, service.directory_name, service.initialized
                );
            }
        }
        Command::Contacts { query } => {
            let pool = db::connect(&config.database.path)
                .await
                .context("failed to open relay database")?;
            let results =
                contact::search_contacts(&pool, &query, config.limits.contact_search_limit)
                    .await?;
            pool.close().await;
            for found in results {
                println!(
                    "{} {} <{}> {}",
                    found.first_name, found.surname, found.email, found.phone
                );
            }
        }
    }
    Ok(())
}
