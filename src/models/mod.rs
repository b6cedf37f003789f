//! Records exchanged with the appliance REST API.
//!
//! # Core Concepts
//!
//! ## Update records
//!
//! - [`UpdateSummary`]: One entry of the pending update list (a version that could be applied).
//! - [`UpdateInfo`]: Full detail of one pending version.
//! - [`PrecheckResult`]: Readiness report produced before an update is applied.
//! - [`StagedUpdate`]: The version currently staged on the appliance, if any.
//! - [`UpdatePolicy`]: Where the appliance looks for updates and when.
//!
//! ## Task records
//!
//! - [`ApplianceUpdate`]: Global update state, carrying the most recent [`TaskInfo`].
//!   Staging and installation are both tracked through this record.
//!
//! ## Account records
//!
//! - [`LocalAccount`]: A local operating-system account on the appliance.
//! - [`LocalAccountUpdate`]: Partial update applied to a local account.
//!
//! These types are owned by the appliance. Fields the tool does not use are
//! kept in an `extra` map so that printed records match what the appliance sent.

/// Declare a string-valued appliance enum.
///
/// Values the tool does not know decode into `Other` and serialize back
/// unchanged, so re-printed records show exactly what the appliance sent.
macro_rules! vendor_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)*
            /// A value this tool does not know, kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)*
                    Self::Other(s) => s.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($wire => Self::$variant,)*
                    _ => Self::Other(s),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(s) => s,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod account;
mod message;
mod task;
mod update;

pub use account::*;
pub use message::*;
pub use task::*;
pub use update::*;
