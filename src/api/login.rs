use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::api::base::{MonarchError, Result};

pub const DEFAULT_SESSION_FILE: &str = ".mm/mm_session.json";

const TOTP_DIGITS: usize = 6;
const TOTP_STEP_SECS: u64 = 30;

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub supports_mfa: bool,
    pub trusted_device: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_expiration: Option<String>,
}

/// Body Monarch sends back alongside a rejected login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginErrorBody {
    pub detail: Option<String>,
    pub error_code: Option<String>,
}

impl LoginErrorBody {
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

#[derive(Builder, Debug, Clone)]
#[builder(default, setter(into))]
pub struct LoginOptions {
    pub save_session: bool,
    pub use_saved_session: bool,
    pub session_file: PathBuf,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            save_session: false,
            use_saved_session: false,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

fn totp_for(secret: &str) -> Result<TOTP> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect::<String>()
        .to_uppercase();
    if normalized.is_empty() {
        return Err(MonarchError::InvalidMfaSecret("secret is empty".into()));
    }

    let bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|err| MonarchError::InvalidMfaSecret(format!("{err:?}")))?;

    Ok(TOTP::new_unchecked(
        Algorithm::SHA1,
        TOTP_DIGITS,
        1,
        TOTP_STEP_SECS,
        bytes,
    ))
}

/// One-time code for `secret` at the given unix time.
#[cfg(test)]
pub fn totp_code_at(secret: &str, unix_secs: u64) -> Result<String> {
    Ok(totp_for(secret)?.generate(unix_secs))
}

pub fn current_totp_code(secret: &str) -> Result<String> {
    Ok(totp_for(secret)?.generate_current()?)
}
