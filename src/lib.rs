//! Operator tooling for vCenter Server Appliance maintenance.
//!
//! Opens one authenticated session against the appliance REST API and runs
//! update and local-account operations through it. See [`maintenance::Maintenance`].

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod models;

pub use client::{ApplianceClient, ClientError};
pub use config::Config;
pub use error::{Error, Result};
pub use maintenance::{Maintenance, TaskOutcome};
