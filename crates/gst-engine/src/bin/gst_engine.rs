//! # gst-engine Operator Tool
//!
//! Prepares and inspects the engine's database.
//!
//! ## Usage
//! ```bash
//! # Apply pending migrations
//! cargo run -p gst-engine -- migrate
//!
//! # Show migration state
//! cargo run -p gst-engine -- status
//!
//! # Use a specific config file or database
//! cargo run -p gst-engine -- migrate --config ./engine.toml
//! cargo run -p gst-engine -- status --db ./data/gst.db
//! ```

use gst_db::Database;
use gst_engine::logging::init_tracing;
use gst_engine::EngineConfig;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn print_help() {
    println!("GST Ledger engine");
    println!();
    println!("Usage: gst-engine <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  migrate            Apply pending database migrations");
    println!("  status             Show database path and migration state");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Config file (default: platform config dir/engine.toml)");
    println!("  -d, --db <PATH>      Database file, overrides config");
    println!("  -h, --help           Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut command: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other if command.is_none() => command = Some(other.to_string()),
            other => {
                eprintln!("Unexpected argument: {}", other);
                print_help();
                std::process::exit(2);
            }
        }
        i += 1;
    }

    let mut config = EngineConfig::load(config_path.as_deref())?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging.filter);

    match command.as_deref() {
        Some("migrate") => {
            if let Some(parent) = config.database.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }

            let db = Database::new(config.db_config()).await?;
            let (total, applied) = db.migration_status().await?;
            info!(total, applied, "Migrations applied");
            println!("✓ {} ({} of {} migrations applied)", config.database.path.display(), applied, total);
            db.close().await;
        }
        Some("status") => {
            let db = Database::new(config.db_config().run_migrations(false)).await?;
            let (total, applied) = db.migration_status().await?;
            println!("Database:   {}", config.database.path.display());
            println!("Migrations: {} of {} applied", applied, total);
            if applied < total {
                println!("Run `gst-engine migrate` to apply the rest.");
            }
            db.close().await;
        }
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(2);
        }
        None => print_help(),
    }

    Ok(())
}
