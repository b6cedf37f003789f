//! Command-line interface of `vcmaint`.
//!
//! Each subcommand maps to one [`Maintenance`] operation. Results go to
//! stdout as pretty JSON; logs go to stderr.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::{Config, PASSWORD_VAR, URL_VAR, USERNAME_VAR};
use crate::maintenance::{Maintenance, TaskOutcome};
use crate::models::{LocalAccountUpdate, SourceType};

const CONNECTION_HEADING: &str = "Connection Options";

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVES: &str = "vcsa_maint=info,vcmaint=info";

/// Tracing filter directives: `RUST_LOG` if set, else the default.
///
/// Read after the env file is loaded so a `RUST_LOG` from the file applies.
pub fn log_directives() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_DIRECTIVES.to_string())
}

#[derive(Debug, Parser)]
#[command(name = "vcmaint")]
#[command(about = "Inspect and apply vCenter Server Appliance updates")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Appliance host name or IP
    #[arg(long, env = URL_VAR, global = true, help_heading = CONNECTION_HEADING)]
    pub url: Option<String>,

    /// Appliance user, e.g. administrator@vsphere.local
    #[arg(long, env = USERNAME_VAR, global = true, help_heading = CONNECTION_HEADING)]
    pub username: Option<String>,

    /// Password of the appliance user
    #[arg(
        long,
        env = PASSWORD_VAR,
        hide_env_values = true,
        global = true,
        help_heading = CONNECTION_HEADING,
    )]
    pub password: Option<String>,

    /// Verify the appliance TLS certificate
    #[arg(long, global = true, help_heading = CONNECTION_HEADING)]
    pub verify_tls: bool,

    /// Seconds between two task status queries
    #[arg(long, default_value_t = 30, global = true, help_heading = CONNECTION_HEADING)]
    pub poll_interval: u64,

    /// Stop waiting on a task after this many seconds
    #[arg(long, global = true, help_heading = CONNECTION_HEADING)]
    pub task_timeout: Option<u64>,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let Some(ref url) = self.url else {
            bail!("appliance URL must be given with --url or {}", URL_VAR);
        };
        let Some(ref username) = self.username else {
            bail!("username must be given with --username or {}", USERNAME_VAR);
        };
        let Some(ref password) = self.password else {
            bail!("password must be given with --password or {}", PASSWORD_VAR);
        };

        let mut config = Config::new(url, username, password);
        config.verify_tls = self.verify_tls;
        config.poll_interval = Duration::from_secs(self.poll_interval);
        config.task_timeout = self.task_timeout.map(Duration::from_secs);
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the pending updates as JSON
    Updates {
        /// Where to look: local, online, or local-and-online
        #[arg(long, default_value_t = SourceType::LocalAndOnline)]
        source: SourceType,

        /// Custom repository URL to query instead of the configured one
        #[arg(long)]
        repo_url: Option<String>,
    },
    /// Print only the versions of the pending updates
    Versions {
        #[arg(long, default_value_t = SourceType::LocalAndOnline)]
        source: SourceType,
    },
    /// Print details of one pending version
    Info { version: String },
    /// Run the readiness precheck for a version
    Precheck { version: String },
    /// Validate a version before staging
    Validate { version: String },
    /// Stage a version and wait for staging to finish
    Stage { version: String },
    /// Install a staged version
    Install {
        version: String,

        /// Wait for the installation task to finish
        #[arg(long)]
        wait: bool,
    },
    /// Print the appliance update state and latest task
    Status,
    /// Print the staged update
    Staged,
    /// Print the update policy
    Policy,
    /// Inspect or update local accounts
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Debug, Subcommand)]
pub enum UserCommands {
    /// List local account names
    List,
    /// Print one local account
    Get { username: String },
    /// Stop an account password from expiring
    NoExpire {
        #[arg(default_value = "root")]
        username: String,
    },
    /// Update password policy or profile fields of an account
    Set {
        username: String,

        #[arg(long, action = clap::ArgAction::Set)]
        password_expires: Option<bool>,

        /// Maximum days between password changes
        #[arg(long)]
        max_days: Option<i64>,

        /// Minimum days between password changes
        #[arg(long)]
        min_days: Option<i64>,

        /// Days of warning before the password expires
        #[arg(long)]
        warn_days: Option<i64>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        fullname: Option<String>,

        #[arg(long, action = clap::ArgAction::Set)]
        enabled: Option<bool>,
    },
}

/// Whether a command did what the operator asked.
///
/// A failed task, or a precheck or validation that reports errors, is a
/// `Failure` even though every API call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    Failure,
}

impl From<&TaskOutcome> for CommandStatus {
    fn from(outcome: &TaskOutcome) -> Self {
        if outcome.is_failed() {
            Self::Failure
        } else {
            Self::Success
        }
    }
}

impl From<CommandStatus> for ExitCode {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Success => ExitCode::SUCCESS,
            CommandStatus::Failure => ExitCode::FAILURE,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", json);
    Ok(())
}

/// Connect, run one command, and log out.
pub async fn execute(cli: Cli) -> anyhow::Result<CommandStatus> {
    let config = cli.connection.to_config()?;

    let vcenter = Maintenance::connect(&config)
        .await
        .with_context(|| format!("Failed to connect to {}", config.api_base()))?;

    let result = run(&vcenter, cli.command).await;

    if let Err(e) = vcenter.close().await {
        tracing::warn!("Failed to close session: {}", e);
    }

    result
}

/// Run one command on an open session.
pub async fn run(vcenter: &Maintenance, command: Commands) -> anyhow::Result<CommandStatus> {
    match command {
        Commands::Updates { source, repo_url } => {
            let updates = vcenter
                .get_updates_from(source, repo_url.as_deref())
                .await?;
            print_json(&updates)?;
        }
        Commands::Versions { source } => {
            print_json(&vcenter.get_versions_from(source).await?)?;
        }
        Commands::Info { version } => {
            print_json(&vcenter.get_version_info(&version).await?)?;
        }
        Commands::Precheck { version } => {
            let result = vcenter.run_precheck(&version).await?;
            print_json(&result)?;
            if result.has_errors() {
                return Ok(CommandStatus::Failure);
            }
        }
        Commands::Validate { version } => {
            let notifications = vcenter.validate(&version).await?;
            print_json(&notifications)?;
            if notifications.has_errors() {
                return Ok(CommandStatus::Failure);
            }
        }
        Commands::Stage { version } => {
            let outcome = vcenter.stage_update(&version).await?;
            return Ok(CommandStatus::from(&outcome));
        }
        Commands::Install { version, wait } => {
            let outcome = vcenter.install_update(&version, wait).await?;
            return Ok(CommandStatus::from(&outcome));
        }
        Commands::Status => print_json(&vcenter.status().await?)?,
        Commands::Staged => print_json(&vcenter.staged().await?)?,
        Commands::Policy => print_json(&vcenter.policy().await?)?,
        Commands::Users(UserCommands::List) => print_json(&vcenter.list_users().await?)?,
        Commands::Users(UserCommands::Get { username }) => {
            print_json(&vcenter.get_user(&username).await?)?;
        }
        Commands::Users(UserCommands::NoExpire { username }) => {
            vcenter.update_user(&username).await?;
        }
        Commands::Users(UserCommands::Set {
            username,
            password_expires,
            max_days,
            min_days,
            warn_days,
            email,
            fullname,
            enabled,
        }) => {
            let update = LocalAccountUpdate {
                fullname,
                email,
                enabled,
                password_expires,
                min_days_between_password_change: min_days,
                max_days_between_password_change: max_days,
                warn_days_before_password_expiration: warn_days,
            };
            vcenter.update_user_with(&username, &update).await?;
        }
    }

    Ok(CommandStatus::Success)
}
