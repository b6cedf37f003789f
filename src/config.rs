//! Connection settings for one appliance.
//!
//! Values come from, highest precedence first: command-line flags, the
//! process environment, and a `.env` file. The env file is only a source of
//! environment variables; it never overrides a variable that is already set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const URL_VAR: &str = "VC_URL";
pub const USERNAME_VAR: &str = "USERNAME";
pub const PASSWORD_VAR: &str = "PASSWORD";
pub const ENV_FILE_VAR: &str = "VCMAINT_ENV_FILE";

/// Default wait between two task status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

const APP_NAME: &str = "vcsa-maint";
const ENV_FILE: &str = ".env";

#[derive(Debug, Clone)]
pub struct Config {
    /// Host name or IP of the appliance, or a full base URL with scheme.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Verify the appliance certificate. Off by default: appliances usually
    /// run with a self-signed certificate.
    pub verify_tls: bool,
    pub poll_interval: Duration,
    /// Give up waiting on a task after this long. `None` waits forever.
    pub task_timeout: Option<Duration>,
}

impl Config {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            verify_tls: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            task_timeout: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::Config(format!("{} must not be empty", URL_VAR)));
        }
        if self.username.is_empty() {
            return Err(Error::Config(format!("{} must not be empty", USERNAME_VAR)));
        }
        if self.password.is_empty() {
            return Err(Error::Config(format!("{} must not be empty", PASSWORD_VAR)));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".into()));
        }
        Ok(())
    }

    /// Base URL of the REST API, without a trailing slash.
    pub fn api_base(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        let base = if url.starts_with("https://") || url.starts_with("http://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };
        if base.ends_with("/api") {
            base
        } else {
            format!("{}/api", base)
        }
    }
}

/// Load a `.env` file into the process environment.
///
/// An explicit path (from `VCMAINT_ENV_FILE`) must exist. Otherwise the
/// working directory and its parents are searched, then the user config
/// directory (`~/.config/vcsa-maint/.env` on Linux). Returns the file that was
/// loaded, if any. Variables that are already set are left alone.
pub fn load_env_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        load_from(path)?;
        return Ok(Some(path.to_path_buf()));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| Error::Config(format!("cannot read working directory: {}", e)))?;
    if let Some(path) = load_nearest(&cwd)? {
        return Ok(Some(path));
    }

    let Some(path) = user_env_path().filter(|p| p.is_file()) else {
        return Ok(None);
    };
    load_from(&path)?;
    Ok(Some(path))
}

/// Load the first `.env` found in `dir` or one of its parents.
///
/// A file that exists but cannot be read or parsed is an error.
pub fn load_nearest(dir: &Path) -> Result<Option<PathBuf>> {
    let Some(path) = dir
        .ancestors()
        .map(|d| d.join(ENV_FILE))
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };
    load_from(&path)?;
    Ok(Some(path))
}

fn load_from(path: &Path) -> Result<()> {
    dotenvy::from_path(path).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

fn user_env_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(APP_NAME);
    path.push(ENV_FILE);
    Some(path)
}
