use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A local operating-system account on the appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub has_password: Option<bool>,
    #[serde(default)]
    pub last_password_change: Option<DateTime<Utc>>,
    /// Absent when the password never expires.
    #[serde(default)]
    pub password_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inactive_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_days_between_password_change: Option<i64>,
    #[serde(default)]
    pub max_days_between_password_change: Option<i64>,
    #[serde(default)]
    pub warn_days_before_password_expiration: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Partial update of a local account. Only fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalAccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_expires: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_days_between_password_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_days_between_password_change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warn_days_before_password_expiration: Option<i64>,
}

impl LocalAccountUpdate {
    /// Update that stops the account password from expiring.
    pub fn never_expire() -> Self {
        Self {
            password_expires: Some(false),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
