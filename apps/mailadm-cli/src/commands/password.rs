//! Offline password commands: hashing, verification and policy checks

use clap::Args;
use mailadm_auth::{is_supported_scheme, verify, CredentialHasher};
use secrecy::{ExposeSecret, SecretString};

use crate::commands::read_secret;
use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// Arguments for the hash command
#[derive(Args, Debug)]
pub struct HashArgs {
    /// Scheme to hash with (default: MAILADM_PASSWORD_DEFAULT_SCHEME)
    #[arg(long, short = 's')]
    pub scheme: Option<String>,

    /// Plaintext password (prompted when omitted)
    pub password: Option<String>,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Stored hash, e.g. `{SSHA512}...`
    pub hash: String,

    /// Plaintext password (prompted when omitted)
    pub password: Option<String>,
}

/// Arguments for the check-password command
#[derive(Args, Debug)]
pub struct CheckPasswordArgs {
    /// Confirmation of the password; defaults to the password itself
    #[arg(long)]
    pub repeat: Option<String>,

    /// Plaintext password (prompted when omitted)
    pub password: Option<String>,
}

fn password_or_prompt(value: Option<String>, prompt: &str) -> CliResult<SecretString> {
    match value {
        Some(value) => Ok(SecretString::new(value)),
        None => read_secret(prompt),
    }
}

pub async fn execute_hash(args: HashArgs, settings: &Settings) -> CliResult<()> {
    let password = password_or_prompt(args.password, "Password")?;
    let hasher = CredentialHasher::new(settings.hash.clone());

    let hash = hasher
        .hash(password.expose_secret(), args.scheme.as_deref())
        .await?;
    println!("{hash}");

    Ok(())
}

pub fn execute_verify(args: VerifyArgs) -> CliResult<()> {
    if !is_supported_scheme(&args.hash) {
        tracing::warn!("hash has no recognized scheme tag; comparing as a bare value");
    }
    let password = password_or_prompt(args.password, "Password")?;

    if verify(password.expose_secret(), &args.hash) {
        println!("Password matches.");
        Ok(())
    } else {
        Err(CliError::PasswordMismatch)
    }
}

pub fn execute_check(args: CheckPasswordArgs, settings: &Settings) -> CliResult<()> {
    let password = password_or_prompt(args.password, "Password")?;
    let repeat = args.repeat.map(SecretString::new);
    let repeat = repeat.as_ref().unwrap_or(&password);

    settings
        .policy
        .validate_change(password.expose_secret(), repeat.expose_secret())?;
    println!("Password is acceptable.");

    Ok(())
}
