use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Args, Subcommand};

use invoicer_infra::export::write_invoices_csv;
use invoicer_invoicing::{Invoice, InvoiceId, InvoiceStatus};

use crate::Session;

#[derive(Debug, Args)]
pub(crate) struct InvoicesCommand {
    #[command(subcommand)]
    command: InvoicesSubcommand,
}

#[derive(Debug, Subcommand)]
enum InvoicesSubcommand {
    /// List invoices, optionally by status
    List {
        #[arg(long)]
        status: Option<InvoiceStatus>,
    },
    /// Print one invoice as JSON
    Show { id: InvoiceId },
    /// Export every invoice as CSV, one row per item
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Dashboard figures
    Summary,
}

pub(crate) async fn run(session: &Session, command: InvoicesCommand) -> anyhow::Result<()> {
    let invoices = session.invoices();
    match command.command {
        InvoicesSubcommand::List { status } => {
            let list = match status {
                Some(status) => invoices.by_status(status).await?,
                None => invoices.list().await?,
            };
            for invoice in &list {
                println!("{}", line(invoice));
            }
        }
        InvoicesSubcommand::Show { id } => {
            let invoice = invoices
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("invoice {id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&invoice)?);
        }
        InvoicesSubcommand::Export { output } => {
            let list = invoices.list().await?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    write_invoices_csv(&list, file)?;
                }
                None => write_invoices_csv(&list, std::io::stdout().lock())?,
            }
        }
        InvoicesSubcommand::Summary => {
            let summary = invoices.summary().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn line(invoice: &Invoice) -> String {
    format!(
        "{}  {:<16} {:<10} {:<8} {:>12.2} {}  {}",
        invoice.id_typed(),
        invoice.invoice_number(),
        invoice.invoice_date(),
        invoice.status(),
        invoice.grand_total(),
        invoice.currency(),
        invoice.customer().name,
    )
}
