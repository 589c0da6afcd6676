//! mailadm - administer mail accounts stored in an LDAP directory
//!
//! This CLI enables administrators to:
//! - List mail domains and their account settings
//! - List, inspect, create and update mailboxes
//! - Set mailbox passwords, hashed in a scheme the mail server accepts
//! - Hash, verify and policy-check passwords offline

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod settings;

use commands::ConnectArgs;
use error::CliResult;
use settings::Settings;

/// mailadm - LDAP mail account administration
#[derive(Parser, Debug)]
#[command(name = "mailadm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mail domains
    Domains(commands::domains::DomainsArgs),

    /// Mailboxes
    Users(commands::users::UsersArgs),

    /// Hash a password without touching the directory
    Hash(commands::password::HashArgs),

    /// Check a password against a stored hash
    Verify(commands::password::VerifyArgs),

    /// Check a password against the password policy
    CheckPassword(commands::password::CheckPasswordArgs),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mailadm_ldap=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Domains(args) => commands::domains::execute(args, &cli.connect).await,
        Commands::Users(args) => commands::users::execute(args, &cli.connect, &settings).await,
        Commands::Hash(args) => commands::password::execute_hash(args, &settings).await,
        Commands::Verify(args) => commands::password::execute_verify(args),
        Commands::CheckPassword(args) => commands::password::execute_check(args, &settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_users_create() {
        let cli = Cli::try_parse_from([
            "mailadm",
            "--user",
            "postmaster@example.com",
            "users",
            "create",
            "carol@example.com",
            "--quota",
            "2048",
            "--password",
            "Abc123!@",
        ])
        .unwrap();

        assert_eq!(cli.connect.user.as_deref(), Some("postmaster@example.com"));
        match cli.command {
            Commands::Users(commands::users::UsersArgs {
                command: commands::users::UsersCommands::Create(args),
            }) => {
                assert_eq!(args.email, "carol@example.com");
                assert_eq!(args.quota, Some(2048));
                assert_eq!(args.password.password.as_deref(), Some("Abc123!@"));
                assert!(!args.password.hashed);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_hashed_requires_password() {
        let result = Cli::try_parse_from([
            "mailadm",
            "users",
            "set-password",
            "alice@example.com",
            "--hashed",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_user_after_subcommand() {
        let cli = Cli::try_parse_from(["mailadm", "domains", "list", "--json", "-u", "vmailadmin"])
            .unwrap();
        assert_eq!(cli.connect.user.as_deref(), Some("vmailadmin"));
    }
}
