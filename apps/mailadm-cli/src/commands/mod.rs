//! Command implementations

pub mod domains;
pub mod password;
pub mod users;

use std::io::{BufRead, IsTerminal};
use std::sync::Arc;

use clap::Args;
use dialoguer::Password;
use mailadm_ldap::{DirectorySession, DnResolver, Identity, LdapConnector, SessionManager};
use secrecy::SecretString;

use crate::error::{CliError, CliResult};
use crate::settings::Settings;

/// How to authenticate against the directory.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Identity to bind as: `postmaster@example.com` or a bare admin name
    #[arg(long, short = 'u', env = "MAILADM_USER", global = true)]
    pub user: Option<String>,

    /// Bind secret. Prefer the environment variable or the prompt.
    #[arg(long, env = "MAILADM_SECRET", hide_env_values = true, global = true)]
    pub secret: Option<String>,
}

/// An open, authorized directory session and the holder that owns it.
pub struct Connection {
    manager: SessionManager<LdapConnector>,
    session: Arc<DirectorySession>,
}

impl Connection {
    pub fn session(&self) -> &DirectorySession {
        &self.session
    }

    /// Unbind before the runtime shuts down.
    pub async fn close(self) {
        self.session.close().await;
        self.manager.close().await;
    }
}

/// Load directory settings, bind and authorize.
pub async fn connect(args: &ConnectArgs) -> CliResult<Connection> {
    let config = Settings::directory()?;
    let resolver = DnResolver::from_config(&config)?;
    let timeout = config.operation_timeout;
    let manager = SessionManager::new(LdapConnector::new(config), resolver, timeout);

    let user = args.user.as_deref().ok_or(CliError::MissingIdentity)?;
    let identity = Identity::parse(user)?;
    let secret = match &args.secret {
        Some(secret) => SecretString::new(secret.clone()),
        None => read_secret(&format!("Password for {identity}"))?,
    };

    let session = manager.open(identity, &secret).await?;
    Ok(Connection { manager, session })
}

/// Read a secret from the terminal without echo, or one line from a pipe.
pub fn read_secret(prompt: &str) -> CliResult<SecretString> {
    if std::io::stdin().is_terminal() {
        let value = Password::new()
            .with_prompt(prompt)
            .interact()?;
        return Ok(SecretString::new(value));
    }

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::new(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

/// Split `local@domain` into its parts.
pub fn split_email(email: &str) -> CliResult<(String, String)> {
    match Identity::parse(email)? {
        Identity::Mailbox { local, domain } => Ok((local, domain)),
        Identity::Admin { .. } => Err(CliError::InvalidInput(format!(
            "'{email}' is not a mail address"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_email() {
        assert_eq!(
            split_email("alice@example.com").unwrap(),
            ("alice".to_string(), "example.com".to_string())
        );
    }

    #[test]
    fn test_split_email_rejects_bare_name() {
        let err = split_email("vmailadmin").unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
        assert!(matches!(
            split_email("@example.com").unwrap_err(),
            CliError::InvalidInput(_)
        ));
    }
}
