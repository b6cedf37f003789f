//! HTTP client for the appliance REST API.
//!
//! Every request after login carries the session id in the
//! `vmware-api-session-id` header. A client can only be obtained through
//! [`ApplianceClient::connect`], so no call is ever issued without a session.

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::models::*;

/// Header carrying the session id on authenticated requests.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: check USERNAME and PASSWORD")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Authenticated client for one appliance.
#[derive(Debug, Clone)]
pub struct ApplianceClient {
    base_url: String,
    session_id: String,
    client: Client,
}

impl ApplianceClient {
    /// Open a session on the appliance described by `config`.
    pub async fn connect(config: &Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;
        let base_url = config.api_base();

        if !config.verify_tls {
            tracing::debug!("Certificate verification disabled for {}", base_url);
        }

        let response = client
            .post(format!("{}/session", base_url))
            .basic_auth(&config.username, Some(&config.password))
            .send()
            .await?;
        let session_id: String = handle_response(response).await?;
        tracing::debug!("Opened session on {} as {}", base_url, config.username);

        Ok(Self {
            base_url,
            session_id,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request carrying the session header.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header(SESSION_HEADER, &self.session_id)
    }

    /// Run an action on a pending version, e.g. `?action=stage`.
    fn pending_action(&self, version: &str, action: &str) -> reqwest::RequestBuilder {
        self.request(Method::POST, &pending_path(version))
            .query(&[("action", action)])
    }

    // ============================================================
    // Update Operations
    // ============================================================

    /// List updates available from `source`, optionally from a custom repository URL.
    pub async fn list_pending(
        &self,
        source: SourceType,
        repo_url: Option<&str>,
    ) -> Result<Vec<UpdateSummary>, ClientError> {
        let mut req = self
            .request(Method::GET, "/appliance/update/pending")
            .query(&[("source_type", source.as_str())]);
        if let Some(url) = repo_url {
            req = req.query(&[("url", url)]);
        }
        let response = req.send().await?;
        handle_response(response).await
    }

    /// Get details of one pending version.
    pub async fn get_pending(&self, version: &str) -> Result<UpdateInfo, ClientError> {
        let response = self
            .request(Method::GET, &pending_path(version))
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn precheck(&self, version: &str) -> Result<PrecheckResult, ClientError> {
        let response = self.pending_action(version, "precheck").send().await?;
        handle_response(response).await
    }

    pub async fn validate(
        &self,
        version: &str,
        user_data: &UserData,
    ) -> Result<Notifications, ClientError> {
        let response = self
            .pending_action(version, "validate")
            .json(&UserDataBody { user_data })
            .send()
            .await?;
        handle_response(response).await
    }

    /// Start staging a version. Returns once the appliance accepted the request.
    pub async fn stage(&self, version: &str) -> Result<(), ClientError> {
        let response = self.pending_action(version, "stage").send().await?;
        handle_empty_response(response).await
    }

    /// Start installing a version. Returns once the appliance accepted the request.
    pub async fn install(&self, version: &str, user_data: &UserData) -> Result<(), ClientError> {
        let response = self
            .pending_action(version, "install")
            .json(&UserDataBody { user_data })
            .send()
            .await?;
        handle_empty_response(response).await
    }

    /// Get the global update state, including the latest task.
    pub async fn get_update(&self) -> Result<ApplianceUpdate, ClientError> {
        let response = self
            .request(Method::GET, "/appliance/update")
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn get_staged(&self) -> Result<StagedUpdate, ClientError> {
        let response = self
            .request(Method::GET, "/appliance/update/staged")
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn get_policy(&self) -> Result<UpdatePolicy, ClientError> {
        let response = self
            .request(Method::GET, "/appliance/update/policy")
            .send()
            .await?;
        handle_response(response).await
    }

    // ============================================================
    // Local Account Operations
    // ============================================================

    /// List local account names.
    pub async fn list_local_accounts(&self) -> Result<Vec<String>, ClientError> {
        let response = self
            .request(Method::GET, "/appliance/local-accounts")
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn get_local_account(&self, username: &str) -> Result<LocalAccount, ClientError> {
        let response = self
            .request(Method::GET, &account_path(username))
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn update_local_account(
        &self,
        username: &str,
        config: &LocalAccountUpdate,
    ) -> Result<(), ClientError> {
        let response = self
            .request(Method::PATCH, &account_path(username))
            .json(config)
            .send()
            .await?;
        handle_empty_response(response).await
    }

    // ============================================================
    // Session
    // ============================================================

    /// Close the session. The client is unusable afterwards.
    pub async fn logout(self) -> Result<(), ClientError> {
        let response = self.request(Method::DELETE, "/session").send().await?;
        handle_empty_response(response).await
    }
}

#[derive(Serialize)]
struct UserDataBody<'a> {
    user_data: &'a UserData,
}

fn pending_path(version: &str) -> String {
    format!("/appliance/update/pending/{}", urlencoding::encode(version))
}

fn account_path(username: &str) -> String {
    format!("/appliance/local-accounts/{}", urlencoding::encode(username))
}

/// Handle response, converting HTTP errors to ClientError.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        Err(error_for(status, response).await)
    }
}

/// Handle response that may return empty body (204 No Content).
async fn handle_empty_response(response: reqwest::Response) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(error_for(status, response).await)
    }
}

async fn error_for(status: StatusCode, response: reqwest::Response) -> ClientError {
    let body = response.text().await.unwrap_or_default();
    let message = describe_error_body(&body);
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden(message),
        _ => ClientError::Server(format!("{}: {}", status, message)),
    }
}

/// Render the appliance error body, falling back to the raw text.
fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if parsed.error_type.is_some() || !parsed.messages.is_empty() => {
            parsed.to_string()
        }
        _ => body.to_string(),
    }
}
