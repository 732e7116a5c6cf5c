//! End-to-end smoke run: login, read accounts and profile, always close.

use std::error::Error as _;
use std::io::Write;

use crate::api::accounts::AccountRecord;
use crate::api::base::{MonarchError, Result};
use crate::api::profile::Profile;
use crate::client::FinanceClient;
use crate::config::SmokeConfig;

const BANNER: &str = "🏦 Monarch Money smoke test";

/// What a run observed. Success is also visible in the printed lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub logged_in: bool,
    pub account_count: Option<usize>,
    pub profile: Option<Profile>,
    pub failure: Option<RunFailure>,
    pub closed: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.profile.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub kind: &'static str,
    pub message: String,
}

pub struct SmokeRunner<C> {
    client: C,
    config: SmokeConfig,
}

impl<C: FinanceClient> SmokeRunner<C> {
    pub fn new(client: C, config: SmokeConfig) -> Self {
        Self { client, config }
    }

    /// Runs the whole sequence, writing the human-readable report to `out`.
    ///
    /// Never fails: step errors are printed and recorded in the report, and
    /// the client is closed exactly once on every path.
    pub async fn run<W: Write>(mut self, out: &mut W) -> RunReport {
        let mut report = RunReport::default();
        let mut console = Console::new(out);

        console.banner();
        if self.config.show_credential_summary {
            console.line(format_args!("📧 Email: {}", self.config.credentials.email));
            console.line(format_args!(
                "🔒 Has MFA Secret: {}",
                self.config.credentials.has_mfa_secret()
            ));
            console.blank();
        }

        if let Err(err) = self.exercise(&mut console, &mut report).await {
            tracing::error!(kind = err.kind(), error = %err, "smoke run failed");
            console.failure(&err, self.config.show_error_kind);
            report.failure = Some(RunFailure {
                kind: err.kind(),
                message: err.to_string(),
            });
        }

        match self.client.close().await {
            Ok(()) => report.closed = true,
            Err(err) => tracing::warn!(error = %err, "failed to close session"),
        }

        report
    }

    async fn exercise<W: Write>(
        &mut self,
        console: &mut Console<'_, W>,
        report: &mut RunReport,
    ) -> Result<()> {
        console.line(format_args!("Attempting login..."));
        self.client
            .login(&self.config.credentials, &self.config.login)
            .await?;
        report.logged_in = true;
        console.line(format_args!("✅ Login successful!"));

        console.blank();
        console.line(format_args!("Fetching accounts..."));
        let accounts = self.client.get_accounts().await?;
        report.account_count = Some(accounts.len());
        console.line(format_args!("✅ Retrieved {} accounts", accounts.len()));
        if !accounts.is_empty() {
            console.blank();
            console.line(format_args!("Account details:"));
            for (i, account) in accounts
                .iter()
                .take(self.config.account_preview_limit)
                .enumerate()
            {
                console.line(format_args!("{}", account_line(i + 1, account)));
            }
        }

        console.blank();
        console.line(format_args!("Getting user info..."));
        let me = self.client.get_me().await?;
        console.line(format_args!("✅ User: {} - {}", me.email(), me.name()));
        report.profile = Some(me);

        Ok(())
    }
}

/// `  1. Checking: $1234.57 (depository)`
pub fn account_line(position: usize, account: &AccountRecord) -> String {
    format!(
        "  {}. {}: ${} ({})",
        position,
        account.display_name(),
        account.formatted_balance(),
        account.type_name()
    )
}

struct Console<'w, W: Write> {
    out: &'w mut W,
}

impl<'w, W: Write> Console<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self { out }
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{args}") {
            tracing::warn!(error = %err, "failed to write report line");
        }
    }

    fn blank(&mut self) {
        self.line(format_args!(""));
    }

    fn banner(&mut self) {
        self.line(format_args!("{}", BANNER));
        self.line(format_args!("{}", "=".repeat(BANNER.chars().count())));
        self.blank();
    }

    fn failure(&mut self, err: &MonarchError, show_kind: bool) {
        self.line(format_args!("❌ Smoke test failed: {err}"));
        if show_kind {
            self.line(format_args!("Error type: {}", err.kind()));
        }

        let mut source = err.source();
        if source.is_some() {
            self.line(format_args!("Caused by:"));
        }
        let mut depth = 0;
        while let Some(cause) = source {
            self.line(format_args!("  {depth}: {cause}"));
            depth += 1;
            source = cause.source();
        }
    }
}
