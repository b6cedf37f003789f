use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LocalizableMessage, Notifications};

/// Key under which the appliance expects the SSO administrator password.
pub const VMDIR_PASSWORD_KEY: &str = "vmdir.password";

/// Extra inputs the appliance needs to validate or install an update.
pub type UserData = BTreeMap<String, String>;

/// Build the user data for validate/install from the connection password.
pub fn vmdir_user_data(password: &str) -> UserData {
    let mut data = UserData::new();
    data.insert(VMDIR_PASSWORD_KEY.to_string(), password.to_string());
    data
}

/// Where the appliance looks for pending updates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// Only ISO images mounted on the appliance.
    Local,
    /// Only the configured online repository.
    Online,
    /// Both of the above.
    #[default]
    LocalAndOnline,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Online => "ONLINE",
            Self::LocalAndOnline => "LOCAL_AND_ONLINE",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "local" => Ok(Self::Local),
            "online" => Ok(Self::Online),
            "local-and-online" => Ok(Self::LocalAndOnline),
            _ => Err(format!(
                "Invalid source '{}'. Must be: local, online, or local-and-online",
                s
            )),
        }
    }
}

/// One pending update, as listed by the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizableMessage>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub update_type: Option<Category>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reboot_required: Option<bool>,
    /// Download size in megabytes.
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Full detail of one pending version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizableMessage>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub update_type: Option<Category>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reboot_required: Option<bool>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub staged: Option<bool>,
    #[serde(default)]
    pub contents: Vec<serde_json::Value>,
    #[serde(default)]
    pub services_will_be_stopped: Vec<serde_json::Value>,
    #[serde(default)]
    pub eulas: Vec<LocalizableMessage>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

vendor_enum! {
    pub enum Priority {
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
}

vendor_enum! {
    pub enum Severity {
        Critical => "CRITICAL",
        Important => "IMPORTANT",
        Moderate => "MODERATE",
        Low => "LOW",
    }
}

vendor_enum! {
    /// Kind of update (the appliance calls this `update_type`).
    pub enum Category {
        Security => "SECURITY",
        Fix => "FIX",
        Update => "UPDATE",
        Upgrade => "UPGRADE",
    }
}

/// Readiness report for one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecheckResult {
    #[serde(default)]
    pub check_time: Option<DateTime<Utc>>,
    /// Minutes.
    #[serde(default)]
    pub estimated_time_to_install: Option<i64>,
    /// Minutes.
    #[serde(default)]
    pub estimated_time_to_rollback: Option<i64>,
    #[serde(default)]
    pub reboot_required: Option<bool>,
    #[serde(default)]
    pub issues: Option<Notifications>,
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PrecheckResult {
    pub fn has_errors(&self) -> bool {
        self.issues.as_ref().is_some_and(Notifications::has_errors)
    }
}

/// The version staged on the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedUpdate {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizableMessage>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub update_type: Option<Category>,
    #[serde(default)]
    pub reboot_required: Option<bool>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub staging_complete: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Update policy of the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePolicy {
    #[serde(rename = "custom_URL", default)]
    pub custom_url: Option<String>,
    #[serde(rename = "default_URL", default)]
    pub default_url: Option<String>,
    #[serde(default)]
    pub auto_stage: Option<bool>,
    #[serde(default)]
    pub auto_update: Option<bool>,
    #[serde(default)]
    pub manual_control: Option<bool>,
    #[serde(default)]
    pub certificate_check: Option<bool>,
    #[serde(default)]
    pub check_schedule: Vec<CheckTime>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTime {
    pub day: String,
    pub hour: i64,
    pub minute: i64,
}
