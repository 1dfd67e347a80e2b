use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;

use invoicer_infra::import::{BulkImporter, ImportOutcome, template_csv};

use crate::Session;

#[derive(Debug, Args)]
pub(crate) struct TemplateArgs {
    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct ImportArgs {
    /// CSV file with one invoice per row
    file: PathBuf,
}

pub(crate) fn template(args: &TemplateArgs) -> anyhow::Result<()> {
    let csv = template_csv().context("failed to build template")?;
    match &args.output {
        Some(path) => std::fs::write(path, csv)
            .with_context(|| format!("failed to write template to {}", path.display()))?,
        None => print!("{csv}"),
    }
    Ok(())
}

pub(crate) async fn run(session: &Session, args: ImportArgs) -> anyhow::Result<()> {
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let importer = BulkImporter::new(session.invoices(), session.config.import_defaults());
    let outcome = importer
        .import_csv(file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    match outcome {
        ImportOutcome::Rejected { violations } => {
            for violation in &violations {
                eprintln!("{violation}");
            }
            bail!("import rejected: {} problem(s), nothing was imported", violations.len());
        }
        ImportOutcome::Persisted(report) => {
            for failure in &report.failures {
                eprintln!("{failure}");
            }
            println!(
                "Upload complete. {} invoices created successfully. {} failed.",
                report.inserted.len(),
                report.failures.len()
            );
            Ok(())
        }
    }
}
