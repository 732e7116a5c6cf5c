use std::fmt;
use std::path::PathBuf;

use crate::api::base::{MonarchError, Result};
use crate::api::login::LoginOptions;
use crate::client::ClientConfig;

pub const DEFAULT_ACCOUNT_PREVIEW_LIMIT: usize = 5;
pub const DEFAULT_DOTENV_FILE: &str = ".env";

/// Login credentials, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub mfa_secret: Option<String>,
}

impl Credentials {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        mfa_secret: Option<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            mfa_secret: mfa_secret.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Reads credentials through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(names: &EnvNames, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MonarchError::Config(format!("{name} is not set")))
        };

        Ok(Self::new(
            required(names.email)?,
            required(names.password)?,
            lookup(names.mfa_secret),
        ))
    }

    pub fn has_mfa_secret(&self) -> bool {
        self.mfa_secret.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("mfa_secret", &self.mfa_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Names of the variables the environment source reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvNames {
    pub email: &'static str,
    pub password: &'static str,
    pub mfa_secret: &'static str,
    pub base_url: &'static str,
}

impl Default for EnvNames {
    fn default() -> Self {
        Self {
            email: "MONARCH_EMAIL",
            password: "MONARCH_PASSWORD",
            mfa_secret: "MONARCH_MFA_SECRET",
            base_url: "MONARCH_BASE_URL",
        }
    }
}

#[derive(Debug, Clone)]
pub enum CredentialSource {
    Literal(Credentials),
    Environment {
        names: EnvNames,
        dotenv_file: Option<PathBuf>,
    },
}

impl CredentialSource {
    /// Environment source with the default variable names and `.env` file.
    pub fn environment() -> Self {
        CredentialSource::Environment {
            names: EnvNames::default(),
            dotenv_file: Some(PathBuf::from(DEFAULT_DOTENV_FILE)),
        }
    }

    /// Loads the key-value file, if any, into the process environment.
    fn load_dotenv(&self) -> Result<()> {
        let CredentialSource::Environment {
            dotenv_file: Some(path),
            ..
        } = self
        else {
            return Ok(());
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no dotenv file, using process environment");
            return Ok(());
        }

        dotenvy::from_path(path).map_err(|err| {
            MonarchError::Config(format!("failed to load {}: {err}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "loaded dotenv file");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SmokeConfig {
    pub credentials: Credentials,
    pub login: LoginOptions,
    pub client: ClientConfig,
    pub account_preview_limit: usize,
    pub show_error_kind: bool,
    pub show_credential_summary: bool,
}

impl SmokeConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            login: LoginOptions::default(),
            client: ClientConfig::default(),
            account_preview_limit: DEFAULT_ACCOUNT_PREVIEW_LIMIT,
            show_error_kind: false,
            show_credential_summary: false,
        }
    }

    pub fn from_source(source: &CredentialSource) -> Result<Self> {
        source.load_dotenv()?;
        Self::from_source_with(source, |name| std::env::var(name).ok())
    }

    /// Same as [`SmokeConfig::from_source`] without touching the dotenv file,
    /// reading variables through `lookup`.
    pub fn from_source_with<F>(source: &CredentialSource, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match source {
            CredentialSource::Literal(credentials) => Ok(Self::new(credentials.clone())),
            CredentialSource::Environment { names, .. } => {
                let mut config = Self::new(Credentials::from_lookup(names, &lookup)?);
                if let Some(base_url) = lookup(names.base_url).filter(|v| !v.trim().is_empty()) {
                    config.client = config.client.with_base_url(base_url);
                }
                config.show_error_kind = true;
                config.show_credential_summary = true;
                Ok(config)
            }
        }
    }
}
