use monarch_smoke::config::{CredentialSource, SmokeConfig};
use monarch_smoke::{telemetry, MonarchMoney, SmokeRunner};

#[tokio::main]
async fn main() {
    if let Err(err) = telemetry::init_subscriber("monarch_smoke=info") {
        eprintln!("{err}");
    }

    let config = match SmokeConfig::from_source(&CredentialSource::environment()) {
        Ok(config) => config,
        Err(err) => {
            println!("❌ Smoke test failed: {err}");
            return;
        }
    };

    let client = match MonarchMoney::with_config(config.client.clone()) {
        Ok(client) => client,
        Err(err) => {
            println!("❌ Smoke test failed: {err}");
            return;
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = SmokeRunner::new(client, config).run(&mut out).await;

    tracing::info!(
        succeeded = report.succeeded(),
        accounts = ?report.account_count,
        closed = report.closed,
        "smoke run finished"
    );
}
