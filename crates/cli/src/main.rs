//! `invoicer` operator CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use invoicer_infra::store::{RecordStore, SqliteRecordStore, StoreSchema};
use invoicer_infra::{CustomerService, InvoiceService, InvoicerConfig};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "invoicer", about = "Invoicing administration CLI", long_about = None)]
struct Cli {
    /// SQLite database file; overrides INVOICER_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the bulk import CSV template
    Template(commands::import::TemplateArgs),
    /// Bulk-import invoices from a CSV file
    Import(commands::import::ImportArgs),
    Invoices(commands::invoices::InvoicesCommand),
    Customers(commands::customers::CustomersCommand),
    /// Convert an invoice's grand total into another currency
    Convert(commands::convert::ConvertArgs),
}

/// Shared handles for one CLI invocation.
pub(crate) struct Session {
    pub config: InvoicerConfig,
    pub store: Arc<dyn RecordStore>,
}

impl Session {
    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::with_policy(Arc::clone(&self.store), self.config.invoice_numbers)
    }

    pub fn customers(&self) -> CustomerService {
        CustomerService::new(Arc::clone(&self.store))
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = InvoicerConfig::from_env().context("failed to load configuration")?;
    invoicer_observability::init(config.log_format);
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    if let Commands::Template(args) = &cli.command {
        return commands::import::template(args);
    }

    let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open(
        config.db_path.clone(),
        StoreSchema::invoicing(),
    ));
    store
        .init()
        .await
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    let session = Session { config, store };
    let result = match cli.command {
        Commands::Template(_) => Ok(()),
        Commands::Import(args) => commands::import::run(&session, args).await,
        Commands::Invoices(cmd) => commands::invoices::run(&session, cmd).await,
        Commands::Customers(cmd) => commands::customers::run(&session, cmd).await,
        Commands::Convert(args) => commands::convert::run(&session, args).await,
    };

    if let Err(err) = session.store.close().await {
        tracing::warn!(error = %err, "failed to close database");
    }
    result
}
