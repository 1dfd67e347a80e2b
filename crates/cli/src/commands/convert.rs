use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::Args;

use invoicer_infra::currency::CurrencyConverter;
use invoicer_invoicing::InvoiceId;

use crate::Session;

#[derive(Debug, Args)]
pub(crate) struct ConvertArgs {
    invoice_id: InvoiceId,

    /// Target currency code
    #[arg(long)]
    to: String,

    /// Use the rates published on this date (YYYY-MM-DD) instead of the latest
    #[arg(long)]
    date: Option<NaiveDate>,
}

pub(crate) async fn run(session: &Session, args: ConvertArgs) -> anyhow::Result<()> {
    let invoice = session
        .invoices()
        .get(&args.invoice_id)
        .await?
        .ok_or_else(|| anyhow!("invoice {} not found", args.invoice_id))?;

    let provider = session
        .config
        .rates
        .provider()
        .context("failed to build rate provider client")?;
    let conversion = CurrencyConverter::new(provider)
        .convert_invoice(&invoice, &args.to, args.date)
        .await
        .with_context(|| format!("failed to convert invoice {}", invoice.invoice_number()))?;

    println!(
        "{} {:.2} {} = {:.2} {} (rate {})",
        invoice.invoice_number(),
        conversion.amount,
        conversion.from,
        conversion.converted,
        conversion.to,
        conversion.rate
    );
    Ok(())
}
