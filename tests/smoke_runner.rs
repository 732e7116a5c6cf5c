use monarch_smoke::{AccountRecord, Credentials, Profile, SmokeConfig, SmokeRunner};

use test_utils::{account, test_config, FailAt, FakeClient};

async fn run(client: FakeClient, config: SmokeConfig) -> (monarch_smoke::RunReport, String) {
    let mut out = Vec::new();
    let report = SmokeRunner::new(client, config).run(&mut out).await;
    (report, String::from_utf8(out).unwrap())
}

#[tokio::test]
async fn test_happy_path_prints_summary_and_closes_once() {
    let accounts: Vec<AccountRecord> = (1..=7)
        .map(|i| account(&format!("Account {i}"), i as f64 * 100.0, "depository"))
        .collect();
    let (client, log) = FakeClient::new(FailAt::Nothing);
    let client = client.with_accounts(accounts);

    let (report, output) = run(client, test_config()).await;

    assert!(output.contains("✅ Login successful!"));
    assert!(output.contains("✅ Retrieved 7 accounts"));
    assert!(output.contains("  1. Account 1: $100.00 (depository)"));
    assert!(output.contains("  5. Account 5: $500.00 (depository)"));
    assert!(!output.contains("Account 6"));
    assert!(output.contains("✅ User: user@example.com - Test User"));
    assert!(!output.contains("❌"));

    assert_eq!(log.calls(), vec!["login", "get_accounts", "get_me", "close"]);
    assert!(report.succeeded());
    assert!(report.logged_in);
    assert_eq!(report.account_count, Some(7));
    assert_eq!(
        report.profile.as_ref().and_then(|p| p.email.as_deref()),
        Some("user@example.com")
    );
    assert!(report.closed);
}

#[tokio::test]
async fn test_balance_is_rounded_to_two_decimals() {
    let (client, _log) = FakeClient::new(FailAt::Nothing);

    let (_report, output) = run(client, test_config()).await;

    assert!(output.contains("  1. Checking: $1234.57 (depository)"));
}

#[tokio::test]
async fn test_login_failure_skips_reads_and_still_closes() {
    let (client, log) = FakeClient::new(FailAt::Login);

    let (report, output) = run(client, test_config()).await;

    assert!(output.contains("❌ Smoke test failed: Login failed (HTTP 401): Invalid credentials"));
    assert!(!output.contains("✅"));
    assert_eq!(log.count("get_accounts"), 0);
    assert_eq!(log.count("get_me"), 0);
    assert_eq!(log.count("close"), 1);

    assert!(!report.logged_in);
    assert!(!report.succeeded());
    let failure = report.failure.unwrap();
    assert_eq!(failure.kind, "LoginFailed");
    assert!(failure.message.contains("Invalid credentials"));
}

#[tokio::test]
async fn test_accounts_failure_after_login() {
    let (client, log) = FakeClient::new(FailAt::Accounts);

    let (report, output) = run(client, test_config()).await;

    let login_line = output.find("✅ Login successful!").unwrap();
    let failure_line = output.find("❌ Smoke test failed").unwrap();
    assert!(login_line < failure_line);
    assert!(output.contains("accounts unavailable"));

    assert_eq!(log.calls(), vec!["login", "get_accounts", "close"]);
    assert!(report.logged_in);
    assert_eq!(report.account_count, None);
    assert_eq!(report.failure.unwrap().kind, "Api");
}

#[tokio::test]
async fn test_profile_failure_after_accounts() {
    let (client, log) = FakeClient::new(FailAt::Profile);

    let (report, output) = run(client, test_config()).await;

    assert!(output.contains("✅ Retrieved 1 accounts"));
    assert!(output.contains("❌ Smoke test failed: Authentication failed: session expired"));
    assert_eq!(log.count("close"), 1);
    assert_eq!(report.account_count, Some(1));
    assert!(report.profile.is_none());
}

#[tokio::test]
async fn test_missing_optional_fields_use_defaults() {
    let bare: AccountRecord = serde_json::from_value(serde_json::json!({})).unwrap();
    let malformed: AccountRecord =
        serde_json::from_value(serde_json::json!({ "displayName": "Card", "type": 7 })).unwrap();
    let (client, _log) = FakeClient::new(FailAt::Nothing);
    let client = client
        .with_accounts(vec![bare, malformed])
        .with_profile(Profile::default());

    let (report, output) = run(client, test_config()).await;

    assert!(output.contains("  1. Unknown: $0.00 (Unknown)"));
    assert!(output.contains("  2. Card: $0.00 (Unknown)"));
    assert!(output.contains("✅ User: Unknown - Unknown"));
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_empty_account_list_has_no_details_section() {
    let (client, _log) = FakeClient::new(FailAt::Nothing);
    let client = client.with_accounts(Vec::new());

    let (report, output) = run(client, test_config()).await;

    assert!(output.contains("✅ Retrieved 0 accounts"));
    assert!(!output.contains("Account details:"));
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_close_called_exactly_once_for_every_failure_point() {
    for fail_at in FailAt::ALL {
        let (client, log) = FakeClient::new(fail_at);

        let (report, _output) = run(client, test_config()).await;

        assert_eq!(log.count("close"), 1, "close count for {fail_at:?}");
        assert_eq!(log.calls().last(), Some(&"close"), "close last for {fail_at:?}");
        assert_eq!(report.closed, fail_at != FailAt::Close, "closed flag for {fail_at:?}");
    }
}

#[tokio::test]
async fn test_no_failure_escapes_the_run() {
    for fail_at in FailAt::ALL {
        let (client, _log) = FakeClient::new(fail_at);

        // run returns a report instead of an error for every injection point
        let (report, output) = run(client, test_config()).await;

        let expect_failure = matches!(fail_at, FailAt::Login | FailAt::Accounts | FailAt::Profile);
        assert_eq!(report.failure.is_some(), expect_failure, "failure for {fail_at:?}");
        assert_eq!(output.contains("❌"), expect_failure, "output for {fail_at:?}");
    }
}

#[tokio::test]
async fn test_environment_variant_prints_summary_and_error_kind() {
    let (client, _log) = FakeClient::new(FailAt::Login);
    let mut config = SmokeConfig::new(Credentials::new("user@example.com", "pw", None));
    config.show_credential_summary = true;
    config.show_error_kind = true;

    let (_report, output) = run(client, config).await;

    assert!(output.contains("📧 Email: user@example.com"));
    assert!(output.contains("🔒 Has MFA Secret: false"));
    assert!(output.contains("Error type: LoginFailed"));
    assert!(!output.contains("pw\n"));
}

#[tokio::test]
async fn test_preview_limit_is_configurable() {
    let accounts = (1..=3)
        .map(|i| account(&format!("Account {i}"), 1.0, "loan"))
        .collect();
    let (client, _log) = FakeClient::new(FailAt::Nothing);
    let mut config = test_config();
    config.account_preview_limit = 2;

    let (_report, output) = run(client.with_accounts(accounts), config).await;

    assert!(output.contains("  2. Account 2: $1.00 (loan)"));
    assert!(!output.contains("Account 3"));
}

/// Output sink whose every write fails.
struct BrokenWriter;

impl std::io::Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed"))
    }
}

#[tokio::test]
async fn test_write_failures_do_not_interrupt_the_run() {
    for fail_at in FailAt::ALL {
        let (client, log) = FakeClient::new(fail_at);

        let report = SmokeRunner::new(client, test_config())
            .run(&mut BrokenWriter)
            .await;

        assert_eq!(log.count("close"), 1, "close count for {fail_at:?}");
        let expect_failure = matches!(fail_at, FailAt::Login | FailAt::Accounts | FailAt::Profile);
        assert_eq!(report.failure.is_some(), expect_failure, "failure for {fail_at:?}");
        if let Some(failure) = &report.failure {
            assert_ne!(failure.kind, "Io", "write error leaked for {fail_at:?}");
        }
    }

    let (client, log) = FakeClient::new(FailAt::Nothing);
    let report = SmokeRunner::new(client, test_config())
        .run(&mut BrokenWriter)
        .await;
    assert!(report.succeeded());
    assert!(report.closed);
    assert_eq!(log.calls(), vec!["login", "get_accounts", "get_me", "close"]);
}
