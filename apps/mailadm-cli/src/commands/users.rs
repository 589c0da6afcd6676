//! Mailbox management commands

use std::io::IsTerminal;

use clap::{Args, Subcommand};
use mailadm_auth::{is_supported_scheme, CredentialHasher};
use mailadm_ldap::{MailAccounts, MailUser, NewMailUser};
use secrecy::{ExposeSecret, SecretString};

use crate::commands::{connect, read_secret, split_email, ConnectArgs};
use crate::error::{CliError, CliResult};
use crate::output::{print_user_details, print_user_table};
use crate::settings::Settings;

/// Mailbox management commands
#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommands,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List the mailboxes of a domain
    List(ListArgs),
    /// Show one mailbox
    Get(GetArgs),
    /// Create a mailbox
    Create(CreateArgs),
    /// Update the profile, quota and status of a mailbox
    Update(UpdateArgs),
    /// Set a new password on a mailbox
    SetPassword(SetPasswordArgs),
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Domain name, e.g. `example.com`
    pub domain: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the get command
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Mail address
    pub email: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// How the new password is supplied.
#[derive(Args, Debug)]
pub struct PasswordInput {
    /// New password (prompted when omitted)
    #[arg(long)]
    pub password: Option<String>,

    /// Treat --password as an existing `{SCHEME}` hash and store it as-is
    #[arg(long, requires = "password")]
    pub hashed: bool,

    /// Scheme to hash with (default: MAILADM_PASSWORD_DEFAULT_SCHEME)
    #[arg(long)]
    pub scheme: Option<String>,
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Mail address of the new mailbox
    pub email: String,

    /// Display name (defaults to the local part)
    #[arg(long)]
    pub cn: Option<String>,

    /// First name
    #[arg(long)]
    pub given_name: Option<String>,

    /// Last name (defaults to the local part)
    #[arg(long)]
    pub sn: Option<String>,

    /// Quota in MB
    #[arg(long)]
    pub quota: Option<i64>,

    /// Create the mailbox disabled
    #[arg(long)]
    pub disabled: bool,

    /// Make the mailbox a global domain administrator
    #[arg(long)]
    pub global_admin: bool,

    #[command(flatten)]
    pub password: PasswordInput,
}

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Mail address
    pub email: String,

    /// Display name (empty string clears it)
    #[arg(long)]
    pub cn: Option<String>,

    /// First name
    #[arg(long)]
    pub given_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub sn: Option<String>,

    /// Job title
    #[arg(long)]
    pub title: Option<String>,

    /// Employee number
    #[arg(long)]
    pub employee_number: Option<String>,

    /// Telephone number
    #[arg(long)]
    pub telephone: Option<String>,

    /// Mobile number
    #[arg(long)]
    pub mobile: Option<String>,

    /// Quota in MB
    #[arg(long)]
    pub quota: Option<i64>,

    /// Set active status (true/false)
    #[arg(long)]
    pub active: Option<bool>,

    /// Set global domain administrator (true/false)
    #[arg(long)]
    pub global_admin: Option<bool>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the set-password command
#[derive(Args, Debug)]
pub struct SetPasswordArgs {
    /// Mail address
    pub email: String,

    #[command(flatten)]
    pub password: PasswordInput,
}

/// Execute mailbox commands
pub async fn execute(
    args: UsersArgs,
    connect_args: &ConnectArgs,
    settings: &Settings,
) -> CliResult<()> {
    // Collect every local input before touching the directory.
    let new_hash = match &args.command {
        UsersCommands::Create(a) => Some(password_hash(&a.password, settings).await?),
        UsersCommands::SetPassword(a) => Some(password_hash(&a.password, settings).await?),
        _ => None,
    };

    let connection = connect(connect_args).await?;
    let accounts = MailAccounts::new(connection.session());

    let result = match args.command {
        UsersCommands::List(a) => execute_list(&accounts, a).await,
        UsersCommands::Get(a) => execute_get(&accounts, a).await,
        UsersCommands::Create(a) => {
            execute_create(&accounts, a, new_hash.unwrap_or_default()).await
        }
        UsersCommands::Update(a) => execute_update(&accounts, a).await,
        UsersCommands::SetPassword(a) => {
            execute_set_password(&accounts, a, new_hash.unwrap_or_default()).await
        }
    };

    connection.close().await;
    result
}

/// Resolve the stored form of a new password: a pre-hashed value with a
/// recognized tag, or a plaintext that passes the policy and gets hashed.
async fn password_hash(input: &PasswordInput, settings: &Settings) -> CliResult<String> {
    if input.hashed {
        let hash = input.password.clone().unwrap_or_default();
        if !is_supported_scheme(&hash) {
            return Err(CliError::InvalidInput(
                "--hashed value must start with a supported {SCHEME} tag".to_string(),
            ));
        }
        return Ok(hash);
    }

    let (password, repeat) = match &input.password {
        Some(value) => (
            SecretString::new(value.clone()),
            SecretString::new(value.clone()),
        ),
        None => {
            let password = read_secret("New password")?;
            let repeat = if std::io::stdin().is_terminal() {
                read_secret("Repeat new password")?
            } else {
                SecretString::new(password.expose_secret().clone())
            };
            (password, repeat)
        }
    };

    settings
        .policy
        .validate_change(password.expose_secret(), repeat.expose_secret())?;

    let hasher = CredentialHasher::new(settings.hash.clone());
    Ok(hasher
        .hash(password.expose_secret(), input.scheme.as_deref())
        .await?)
}

async fn execute_list(accounts: &MailAccounts<'_>, args: ListArgs) -> CliResult<()> {
    let users = accounts.list_users(&args.domain).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        println!("No users found.");
    } else {
        print_user_table(&users);
        println!("\n{} user(s) in {}", users.len(), args.domain);
    }

    Ok(())
}

async fn fetch_user(accounts: &MailAccounts<'_>, email: &str) -> CliResult<MailUser> {
    let (uid, domain) = split_email(email)?;
    accounts
        .get_user(&domain, &uid)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("user {email}")))
}

async fn execute_get(accounts: &MailAccounts<'_>, args: GetArgs) -> CliResult<()> {
    let user = fetch_user(accounts, &args.email).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        print_user_details(&user);
    }

    Ok(())
}

async fn execute_create(
    accounts: &MailAccounts<'_>,
    args: CreateArgs,
    hash: String,
) -> CliResult<()> {
    let (uid, domain) = split_email(&args.email)?;

    let mut user = NewMailUser::new(uid);
    user.cn = args.cn.unwrap_or_default();
    user.given_name = args.given_name.unwrap_or_default();
    user.sn = args.sn.unwrap_or_default();
    if let Some(quota) = args.quota {
        user.mail_quota = quota;
    }
    user.account_status = !args.disabled;
    user.domain_global_admin = args.global_admin;

    accounts.create_user(&domain, &user, &hash).await?;
    println!("User created: {}", args.email);

    Ok(())
}

async fn execute_update(accounts: &MailAccounts<'_>, args: UpdateArgs) -> CliResult<()> {
    let (_, domain) = split_email(&args.email)?;
    let mut user = fetch_user(accounts, &args.email).await?;

    let text_updates = [
        (&mut user.cn, args.cn),
        (&mut user.given_name, args.given_name),
        (&mut user.sn, args.sn),
        (&mut user.title, args.title),
        (&mut user.employee_number, args.employee_number),
        (&mut user.telephone_number, args.telephone),
        (&mut user.mobile, args.mobile),
    ];
    for (field, value) in text_updates {
        if let Some(value) = value {
            *field = value;
        }
    }
    if let Some(quota) = args.quota {
        user.mail_quota = quota;
    }
    if let Some(active) = args.active {
        user.account_status = active;
    }
    if let Some(global_admin) = args.global_admin {
        user.domain_global_admin = global_admin;
    }

    let user = user.trimmed();
    accounts.update_user(&domain, &user).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("User updated successfully!");
        println!();
        print_user_details(&user);
    }

    Ok(())
}

async fn execute_set_password(
    accounts: &MailAccounts<'_>,
    args: SetPasswordArgs,
    hash: String,
) -> CliResult<()> {
    let (uid, domain) = split_email(&args.email)?;
    if !accounts.user_exists(&domain, &uid).await? {
        return Err(CliError::NotFound(format!("user {}", args.email)));
    }

    accounts.update_user_password(&domain, &uid, &hash).await?;
    println!("Password updated: {}", args.email);

    Ok(())
}
