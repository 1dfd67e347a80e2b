use clap::{Args, Subcommand};

use crate::Session;

#[derive(Debug, Args)]
pub(crate) struct CustomersCommand {
    #[command(subcommand)]
    command: CustomersSubcommand,
}

#[derive(Debug, Subcommand)]
enum CustomersSubcommand {
    /// List customers, optionally filtered by name, email or company
    List {
        #[arg(long)]
        search: Option<String>,
    },
}

pub(crate) async fn run(session: &Session, command: CustomersCommand) -> anyhow::Result<()> {
    let customers = session.customers();
    match command.command {
        CustomersSubcommand::List { search } => {
            let list = customers.search(search.as_deref().unwrap_or_default()).await?;
            for customer in &list {
                println!(
                    "{}  {:<24} {:<32} {}",
                    customer.id_typed(),
                    customer.name(),
                    customer.email(),
                    customer.company().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
