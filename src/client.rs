use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::api::accounts::AccountRecord;
use crate::api::base::{GraphQlRequest, GraphQlResponse, MonarchError, Result};
use crate::api::login::{current_totp_code, LoginErrorBody, LoginOptions, LoginRequest, LoginResponse};
use crate::api::profile::Profile;
use crate::api::session::SavedSession;
use crate::config::Credentials;

pub const BASE_URL: &str = "https://api.monarchmoney.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const LOGIN_PATH: &str = "/auth/login/";
const GRAPHQL_PATH: &str = "/graphql";
const ORIGIN: &str = "https://app.monarchmoney.com";
const USER_AGENT: &str = "monarch-smoke";
const DEVICE_UUID_HEADER: &str = "device-uuid";

/// Operations the smoke runner needs from an account-aggregation client.
#[async_trait]
pub trait FinanceClient: Send + Sync {
    async fn login(&mut self, credentials: &Credentials, options: &LoginOptions) -> Result<()>;

    async fn get_accounts(&self) -> Result<Vec<AccountRecord>>;

    async fn get_me(&self) -> Result<Profile>;

    /// Releases the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks the base URL and strips any trailing slash.
    fn normalized_base_url(&self) -> Result<String> {
        let parsed = Url::parse(&self.base_url).map_err(|err| {
            MonarchError::Config(format!("invalid base URL {:?}: {err}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MonarchError::Config(format!(
                "base URL must be http or https, got {}",
                parsed.scheme()
            )));
        }
        Ok(self.base_url.trim_end_matches('/').to_string())
    }
}

pub struct MonarchMoney {
    pub(crate) client: reqwest::Client,
    base_url: String,
    device_uuid: String,
    token: Option<String>,
    // set while the token came from a saved session file
    reused_session: Option<PathBuf>,
    closed: bool,
}

impl MonarchMoney {
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let base_url = config.normalized_base_url()?;
        let client = Self::create_client(config.timeout)?;

        Ok(Self {
            client,
            base_url,
            device_uuid: Uuid::new_v4().to_string(),
            token: None,
            reused_session: None,
            closed: false,
        })
    }

    fn create_client(timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert("client-platform", HeaderValue::from_static("web"));

        Ok(ClientBuilder::new()
            .default_headers(headers)
            .timeout(timeout)
            .build()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub async fn login(&mut self, credentials: &Credentials, options: &LoginOptions) -> Result<()> {
        if self.closed {
            return Err(MonarchError::SessionClosed);
        }

        if options.use_saved_session {
            if let Some(saved) = SavedSession::load(&options.session_file)? {
                tracing::info!(
                    path = %options.session_file.display(),
                    "reusing saved Monarch Money session"
                );
                self.device_uuid = saved.device_uuid;
                self.token = Some(saved.token);
                self.reused_session = Some(options.session_file.clone());
                return Ok(());
            }
        }

        let totp = credentials
            .mfa_secret
            .as_deref()
            .map(current_totp_code)
            .transpose()?;

        let response = self
            .do_login_request(credentials, totp.as_deref(), options.save_session)
            .await?;

        if options.save_session {
            SavedSession::new(&response.token, &self.device_uuid).save(&options.session_file)?;
        }
        self.token = Some(response.token);
        self.reused_session = None;

        tracing::info!(email = %credentials.email, "logged in to Monarch Money");
        Ok(())
    }

    async fn do_login_request(
        &self,
        credentials: &Credentials,
        totp: Option<&str>,
        trusted_device: bool,
    ) -> Result<LoginResponse> {
        let url = format!("{}{}", self.base_url, LOGIN_PATH);

        let response = self
            .client
            .post(&url)
            .header(DEVICE_UUID_HEADER, &self.device_uuid)
            .json(&LoginRequest {
                username: &credentials.email,
                password: &credentials.password,
                supports_mfa: true,
                trusted_device,
                totp,
            })
            .send()
            .await?;
        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let text = response.text().await?;

        tracing::debug!(
            "monarch POST {} status={} has_totp={}",
            url,
            status.as_u16(),
            totp.is_some()
        );

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|err| {
                tracing::error!(error = %err, "failed to parse login response (status {})", status);
                MonarchError::UnexpectedResponse {
                    status: status.as_u16(),
                    body: text,
                }
            });
        }

        tracing::warn!(
            status = %status,
            url = %url,
            body = %text,
            "login rejected by Monarch Money"
        );

        let body = LoginErrorBody::parse(&text);
        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(MonarchError::RateLimited { retry_after }),
            StatusCode::FORBIDDEN if totp.is_none() => Err(MonarchError::MfaRequired),
            _ if status.is_server_error() => Err(MonarchError::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }),
            _ => Err(MonarchError::LoginFailed {
                status: status.as_u16(),
                message: body
                    .detail
                    .or(body.error_code)
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_else(|| "login rejected".to_string()),
            }),
        }
    }

    /// Runs one GraphQL operation under the current session.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        if self.closed {
            return Err(MonarchError::SessionClosed);
        }
        let token = self.token.as_deref().ok_or(MonarchError::NotLoggedIn)?;
        let url = format!("{}{}", self.base_url, GRAPHQL_PATH);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Token {token}"))
            .header(DEVICE_UUID_HEADER, &self.device_uuid)
            .json(&GraphQlRequest {
                operation_name: operation,
                query: query.trim(),
                variables,
            })
            .send()
            .await?;
        let status = response.status();
        let retry_after = retry_after_secs(response.headers());
        let text = response.text().await?;

        tracing::debug!(
            "monarch {} status={} body={}",
            operation,
            status.as_u16(),
            text
        );

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!(status = %status, operation, "session rejected by Monarch Money");
                self.discard_saved_session();
                return Err(MonarchError::Unauthorized(format!(
                    "{operation} rejected with HTTP {}",
                    status.as_u16()
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(MonarchError::RateLimited { retry_after }),
            _ => {}
        }

        let result: GraphQlResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "failed to parse {} response (status {}): {}",
                    operation,
                    status,
                    text
                );
                return Err(MonarchError::UnexpectedResponse {
                    status: status.as_u16(),
                    body: text,
                });
            }
        };

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                operation,
                body = %text,
                "received non-success HTTP status from Monarch Money"
            );
            if result.data.is_none() && result.errors.is_empty() {
                return Err(MonarchError::UnexpectedResponse {
                    status: status.as_u16(),
                    body: text,
                });
            }
        }

        result.into_result().map_err(|err| {
            tracing::error!(error = %err, operation, "Monarch Money GraphQL call failed");
            if matches!(err, MonarchError::Unauthorized(_)) {
                self.discard_saved_session();
            }
            err
        })
    }

    /// Removes a reused session file once its token has been rejected, so the
    /// next run logs in again.
    fn discard_saved_session(&self) {
        let Some(path) = &self.reused_session else {
            return;
        };
        match SavedSession::delete(path) {
            Ok(()) => tracing::info!(path = %path.display(), "removed rejected saved session"),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove saved session")
            }
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        if !self.closed {
            tracing::debug!(device_uuid = %self.device_uuid, "closing Monarch Money session");
        }
        self.token = None;
        self.closed = true;
        Ok(())
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl FinanceClient for MonarchMoney {
    async fn login(&mut self, credentials: &Credentials, options: &LoginOptions) -> Result<()> {
        MonarchMoney::login(self, credentials, options).await
    }

    async fn get_accounts(&self) -> Result<Vec<AccountRecord>> {
        MonarchMoney::get_accounts(self).await
    }

    async fn get_me(&self) -> Result<Profile> {
        MonarchMoney::get_me(self).await
    }

    async fn close(&mut self) -> Result<()> {
        MonarchMoney::close(self).await
    }
}
