pub mod api;
pub mod client;
pub mod config;
pub mod smoke;
pub mod telemetry;

pub use api::accounts::AccountRecord;
pub use api::base::{MonarchError, Result};
pub use api::login::{LoginOptions, LoginOptionsBuilder};
pub use api::profile::Profile;
pub use client::{ClientConfig, FinanceClient, MonarchMoney};
pub use config::{CredentialSource, Credentials, SmokeConfig};
pub use smoke::{RunReport, SmokeRunner};
