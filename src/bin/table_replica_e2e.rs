//! table-replica-e2e: runs the replica scenarios against a live cluster
//! with the table controller installed.

use clap::Parser;
use kube::Client;
use tracing::{error, info};

use table_replica_e2e::config::HarnessConfig;
use table_replica_e2e::control_plane::KubeControlPlane;
use table_replica_e2e::driver::ScenarioDriver;
use table_replica_e2e::scenarios;
use table_replica_e2e::table_status::DynamoDbTableStatus;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = HarnessConfig::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,kube=warn,hyper=warn,tower=warn,aws=warn".into());

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let client = Client::try_default().await?;
    let tables = DynamoDbTableStatus::for_region(&config.aws_region).await;

    info!(
        ns = %config.namespace,
        region = %config.aws_region,
        replicas = ?[&config.replica_region_1, &config.replica_region_2],
        "starting table-replica-e2e"
    );

    let driver = ScenarioDriver::new(KubeControlPlane::new(client), tables, config)?;
    let results = scenarios::run_all(&driver).await;

    let failed: Vec<_> = results.iter().filter(|r| !r.passed()).collect();
    for r in &results {
        match &r.outcome {
            Ok(()) => info!(scenario = r.name, elapsed = ?r.elapsed, "PASS"),
            Err(e) => error!(scenario = r.name, elapsed = ?r.elapsed, error = %e, "FAIL"),
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("{} of {} scenarios failed", failed.len(), results.len());
    }
    info!(count = results.len(), "all scenarios passed");
    Ok(())
}
