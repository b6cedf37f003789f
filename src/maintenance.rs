//! Day-to-day maintenance operations on one appliance.
//!
//! [`Maintenance`] owns one authenticated session and exposes each operator
//! action as a method: list and inspect pending updates, precheck, validate,
//! stage and install a version, and inspect or adjust local accounts.

use std::time::{Duration, Instant};

use crate::client::ApplianceClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::*;

/// How an appliance task ended, as seen by the poller.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Succeeded,
    /// The task failed. Carries the appliance's explanation when it gave one.
    Failed { message: Option<String> },
    /// The task stopped in a status that is neither success nor failure.
    Stopped(TaskStatus),
    /// The appliance reported no task at all.
    NoTask,
    /// The appliance accepted the request and nobody waited for the task.
    Requested,
}

impl TaskOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    fn from_update(update: &ApplianceUpdate) -> Self {
        match update.task {
            None => Self::NoTask,
            Some(ref task) => match &task.status {
                TaskStatus::Succeeded => Self::Succeeded,
                TaskStatus::Failed => Self::Failed {
                    message: task.failure_message(),
                },
                other => Self::Stopped(other.clone()),
            },
        }
    }
}

pub struct Maintenance {
    client: ApplianceClient,
    user_data: UserData,
    poll_interval: Duration,
    task_timeout: Option<Duration>,
}

impl Maintenance {
    /// Validate `config` and open a session on the appliance.
    pub async fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = ApplianceClient::connect(config).await?;
        Ok(Self::new(client, config))
    }

    /// Wrap an already connected client.
    pub fn new(client: ApplianceClient, config: &Config) -> Self {
        Self {
            client,
            user_data: vmdir_user_data(&config.password),
            poll_interval: config.poll_interval,
            task_timeout: config.task_timeout,
        }
    }

    // ============================================================
    // Updates
    // ============================================================

    /// Pending updates from local and online sources.
    pub async fn get_updates(&self) -> Result<Vec<UpdateSummary>> {
        self.get_updates_from(SourceType::LocalAndOnline, None).await
    }

    pub async fn get_updates_from(
        &self,
        source: SourceType,
        repo_url: Option<&str>,
    ) -> Result<Vec<UpdateSummary>> {
        let updates = self.client.list_pending(source, repo_url).await?;
        tracing::debug!("{} pending update(s) from {}", updates.len(), source);
        Ok(updates)
    }

    /// Version strings of the pending updates from local and online sources.
    pub async fn get_versions(&self) -> Result<Vec<String>> {
        self.get_versions_from(SourceType::LocalAndOnline).await
    }

    pub async fn get_versions_from(&self, source: SourceType) -> Result<Vec<String>> {
        let updates = self.get_updates_from(source, None).await?;
        Ok(updates.into_iter().map(|u| u.version).collect())
    }

    pub async fn run_precheck(&self, version: &str) -> Result<PrecheckResult> {
        tracing::info!("Running precheck for {}", version);
        Ok(self.client.precheck(version).await?)
    }

    pub async fn get_version_info(&self, version: &str) -> Result<UpdateInfo> {
        Ok(self.client.get_pending(version).await?)
    }

    /// Validate a version before staging.
    pub async fn validate(&self, version: &str) -> Result<Notifications> {
        tracing::info!("Validating {}", version);
        Ok(self.client.validate(version, &self.user_data).await?)
    }

    /// Stage a version and wait for the staging task to finish.
    ///
    /// A failed staging task is logged and returned as
    /// [`TaskOutcome::Failed`]; it is not an error.
    pub async fn stage_update(&self, version: &str) -> Result<TaskOutcome> {
        tracing::info!("Staging {} for update", version);
        self.client.stage(version).await?;

        let outcome = self.wait_for_task("Staging").await?;
        if let TaskOutcome::Failed { ref message } = outcome {
            match message {
                Some(msg) => tracing::error!("Staging step failed: {}", msg),
                None => tracing::error!("Staging step failed"),
            }
        }
        Ok(outcome)
    }

    /// Install a staged version.
    ///
    /// Without `wait` this returns [`TaskOutcome::Requested`] as soon as the
    /// appliance accepted the request.
    pub async fn install_update(&self, version: &str, wait: bool) -> Result<TaskOutcome> {
        tracing::info!("Installing {}", version);
        self.client.install(version, &self.user_data).await?;

        if !wait {
            return Ok(TaskOutcome::Requested);
        }

        let outcome = self.wait_for_task("Installation").await?;
        if let TaskOutcome::Failed { ref message } = outcome {
            match message {
                Some(msg) => tracing::error!("Installation failed: {}", msg),
                None => tracing::error!("Installation failed"),
            }
        }
        Ok(outcome)
    }

    /// Poll the appliance update task until it leaves an in-flight status.
    ///
    /// With a task timeout, the last sleep is cut short so the wait ends at
    /// the limit plus one status query.
    async fn wait_for_task(&self, label: &str) -> Result<TaskOutcome> {
        let started = Instant::now();
        let mut update = self.client.get_update().await?;

        while let Some(status) = in_flight_status(&update) {
            let pause = match self.task_timeout {
                Some(limit) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(Error::TaskTimeout { status, waited });
                    }
                    self.poll_interval.min(limit - waited)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(pause).await;
            tracing::info!("{} status: {}", label, status);
            update = self.client.get_update().await?;
        }

        Ok(TaskOutcome::from_update(&update))
    }

    /// Global update state of the appliance.
    pub async fn status(&self) -> Result<ApplianceUpdate> {
        Ok(self.client.get_update().await?)
    }

    pub async fn staged(&self) -> Result<StagedUpdate> {
        Ok(self.client.get_staged().await?)
    }

    pub async fn policy(&self) -> Result<UpdatePolicy> {
        Ok(self.client.get_policy().await?)
    }

    // ============================================================
    // Local Accounts
    // ============================================================

    pub async fn list_users(&self) -> Result<Vec<String>> {
        Ok(self.client.list_local_accounts().await?)
    }

    pub async fn get_user(&self, username: &str) -> Result<LocalAccount> {
        Ok(self.client.get_local_account(username).await?)
    }

    /// Stop the password of `username` from expiring.
    pub async fn update_user(&self, username: &str) -> Result<()> {
        self.update_user_with(username, &LocalAccountUpdate::never_expire())
            .await
    }

    pub async fn update_user_with(
        &self,
        username: &str,
        config: &LocalAccountUpdate,
    ) -> Result<()> {
        if config.is_empty() {
            return Err(Error::Config(format!(
                "nothing to update for local account '{}'",
                username
            )));
        }
        tracing::info!("Updating local account {}", username);
        Ok(self.client.update_local_account(username, config).await?)
    }

    /// Log out of the appliance.
    pub async fn close(self) -> Result<()> {
        Ok(self.client.logout().await?)
    }
}

fn in_flight_status(update: &ApplianceUpdate) -> Option<TaskStatus> {
    update
        .task
        .as_ref()
        .map(|t| &t.status)
        .filter(|s| s.is_in_flight())
        .cloned()
}
