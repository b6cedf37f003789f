use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LocalizableMessage;

/// Global update state of the appliance.
///
/// Staging and installation run as appliance-side tasks; the most recent one
/// is reported in `task`. The appliance omits `task` when nothing has run yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceUpdate {
    pub state: UpdateState,
    #[serde(default)]
    pub task: Option<TaskInfo>,
    /// Version currently installed.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub latest_query_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

vendor_enum! {
    /// Coarse update state reported by the appliance.
    pub enum UpdateState {
        UpToDate => "UP_TO_DATE",
        UpdatesPending => "UPDATES_PENDING",
        StageInProgress => "STAGE_IN_PROGRESS",
        InstallInProgress => "INSTALL_IN_PROGRESS",
        InstallFailed => "INSTALL_FAILED",
        RollbackInProgress => "ROLLBACK_IN_PROGRESS",
    }
}

/// An appliance-side task such as staging or installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub status: TaskStatus,
    #[serde(default)]
    pub description: Option<LocalizableMessage>,
    #[serde(default)]
    pub progress: Option<TaskProgress>,
    /// Vendor error structure, present when `status` is `Failed`.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TaskInfo {
    /// Best human-readable explanation of a failed task.
    pub fn failure_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        error
            .get("messages")
            .and_then(|m| m.as_array())
            .and_then(|m| m.first())
            .and_then(|m| m.get("default_message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .or_else(|| Some(error.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub total: i64,
    pub completed: i64,
    #[serde(default)]
    pub message: Option<LocalizableMessage>,
}

vendor_enum! {
    /// The execution status of an appliance task.
    ///
    /// - `Pending`: Accepted but not started
    /// - `Running`: In progress
    /// - `Blocked`: Waiting on something outside the task
    /// - `Succeeded`: Finished successfully
    /// - `Failed`: Finished with an error
    pub enum TaskStatus {
        Pending => "PENDING",
        Running => "RUNNING",
        Blocked => "BLOCKED",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
    }
}

impl TaskStatus {
    /// Whether a poller should keep waiting on this status.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}
