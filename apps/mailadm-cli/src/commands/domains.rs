//! Mail domain commands

use clap::{Args, Subcommand};
use mailadm_ldap::MailAccounts;

use crate::commands::{connect, ConnectArgs};
use crate::error::CliResult;
use crate::output::{print_domain_table, print_settings};

/// Mail domain commands
#[derive(Args, Debug)]
pub struct DomainsArgs {
    #[command(subcommand)]
    pub command: DomainsCommands,
}

#[derive(Subcommand, Debug)]
pub enum DomainsCommands {
    /// List all mail domains
    List(ListArgs),
    /// Show the account settings of a domain
    Settings(SettingsArgs),
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the settings command
#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Domain name, e.g. `example.com`
    pub domain: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute domain commands
pub async fn execute(args: DomainsArgs, connect_args: &ConnectArgs) -> CliResult<()> {
    let connection = connect(connect_args).await?;
    let accounts = MailAccounts::new(connection.session());

    let result = match args.command {
        DomainsCommands::List(a) => execute_list(&accounts, a).await,
        DomainsCommands::Settings(a) => execute_settings(&accounts, a).await,
    };

    connection.close().await;
    result
}

async fn execute_list(accounts: &MailAccounts<'_>, args: ListArgs) -> CliResult<()> {
    let domains = accounts.list_domains().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&domains)?);
    } else if domains.is_empty() {
        println!("No domains found.");
    } else {
        print_domain_table(&domains);
        println!("\n{} domain(s)", domains.len());
    }

    Ok(())
}

async fn execute_settings(accounts: &MailAccounts<'_>, args: SettingsArgs) -> CliResult<()> {
    let settings = accounts.domain_settings(&args.domain).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&args.domain, &settings);
    }

    Ok(())
}
