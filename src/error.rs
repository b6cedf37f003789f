use std::time::Duration;

use thiserror::Error;

use crate::client::ClientError;
use crate::models::TaskStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Appliance request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Task still {status} after {waited:?}")]
    TaskTimeout { status: TaskStatus, waited: Duration },
}

pub type Result<T> = std::result::Result<T, Error>;
