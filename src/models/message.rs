use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message the appliance can render in several locales.
///
/// Only `default_message` is meant for humans; `id` identifies the template.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizableMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub default_message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl fmt::Display for LocalizableMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.default_message.is_empty() {
            f.write_str(&self.id)
        } else {
            f.write_str(&self.default_message)
        }
    }
}

/// A single finding reported by a precheck or a validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<LocalizableMessage>,
    #[serde(default)]
    pub resolution: Option<LocalizableMessage>,
}

/// Findings grouped by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default)]
    pub info: Vec<Notification>,
    #[serde(default)]
    pub warnings: Vec<Notification>,
    #[serde(default)]
    pub errors: Vec<Notification>,
}

impl Notifications {
    /// True when the appliance reported at least one blocking error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Error body returned by the appliance alongside non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error_type: Option<String>,
    #[serde(default)]
    pub messages: Vec<LocalizableMessage>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref kind) = self.error_type {
            write!(f, "{}", kind)?;
            if !self.messages.is_empty() {
                f.write_str(": ")?;
            }
        }
        let messages: Vec<String> = self.messages.iter().map(|m| m.to_string()).collect();
        f.write_str(&messages.join("; "))
    }
}
