//! The replica scenarios, in the order they run against a live cluster.
//!
//! Scenarios 1 to 4 share one table and depend on each other's end state
//! (one replica, then two, then one, then deleted).  The invalid-stream
//! scenario gets its own table.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::control_plane::{ControlPlane, ResourceHandle};
use crate::crd::table::{table_with_invalid_replicas, table_with_replicas, Table};
use crate::driver::ScenarioDriver;
use crate::error::{Error, Result};
use crate::helpers::random_suffix_name;
use crate::observed::{ReplicaState, TableState};
use crate::predicate::{ReplicaRegionSetEquals, ReplicaStatusEquals, StatusEquals};
use crate::table_status::TableStatusApi;

/// Generated resource and table names are capped at this length.
pub const NAME_MAX_LEN: usize = 32;

#[derive(Debug)]
pub struct ScenarioResult {
    pub name: &'static str,
    pub outcome: Result<()>,
    pub elapsed: Duration,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

async fn timed<F>(name: &'static str, scenario: F) -> ScenarioResult
where
    F: std::future::Future<Output = Result<()>>,
{
    info!(scenario = name, "starting");
    let start = Instant::now();
    let outcome = scenario.await;
    let elapsed = start.elapsed();
    match &outcome {
        Ok(()) => info!(scenario = name, ?elapsed, "passed"),
        Err(e) => error!(scenario = name, ?elapsed, error = %e, "failed"),
    }
    ScenarioResult {
        name,
        outcome,
        elapsed,
    }
}

async fn require_table<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    table_name: &str,
) -> Result<()> {
    if driver.table_exists(table_name).await? {
        Ok(())
    } else {
        Err(Error::NotFound(format!("table {table_name}")))
    }
}

/// Table becomes ACTIVE with exactly the one replica it was created with.
pub async fn create_table_with_replica<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    table_name: &str,
) -> Result<()> {
    let cfg = driver.config();
    let r1 = cfg.replica_region_1.as_str();
    let policy = cfg.replica_policy()?;

    require_table(driver, table_name).await?;
    driver
        .await_table(table_name, &StatusEquals(TableState::Active), &policy)
        .await?;
    driver
        .await_table(table_name, &ReplicaRegionSetEquals::new([r1]), &policy)
        .await?;
    driver
        .await_table(
            table_name,
            &ReplicaStatusEquals::new(r1, ReplicaState::Active),
            &policy,
        )
        .await?;
    driver
        .assert_replicas(table_name, &[r1], Some(&ReplicaState::Active))
        .await?;
    Ok(())
}

/// Adding a second region converges to two ACTIVE replicas.
pub async fn add_replica<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    handle: &ResourceHandle,
    table_name: &str,
) -> Result<()> {
    let cfg = driver.config();
    let (r1, r2) = (cfg.replica_region_1.as_str(), cfg.replica_region_2.as_str());
    let policy = cfg.replica_policy()?;

    require_table(driver, table_name).await?;
    driver.set_replicas(handle, &[r1, r2]).await?;
    driver
        .await_table(table_name, &ReplicaRegionSetEquals::new([r1, r2]), &policy)
        .await?;
    driver
        .await_table(
            table_name,
            &ReplicaStatusEquals::new(r2, ReplicaState::Active),
            &policy,
        )
        .await?;
    driver
        .assert_replicas(table_name, &[r1, r2], Some(&ReplicaState::Active))
        .await?;
    Ok(())
}

/// Dropping the second region converges back to the first alone.
pub async fn remove_replica<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    handle: &ResourceHandle,
    table_name: &str,
) -> Result<()> {
    let cfg = driver.config();
    let (r1, r2) = (cfg.replica_region_1.as_str(), cfg.replica_region_2.as_str());
    let policy = cfg.replica_policy()?;

    require_table(driver, table_name).await?;
    driver.remove_replica(handle, r2).await?;
    driver
        .await_table(table_name, &ReplicaRegionSetEquals::new([r1]), &policy)
        .await?;
    driver.assert_replicas(table_name, &[r1], None).await?;
    Ok(())
}

/// Deleting the resource removes the table and all its replicas.
pub async fn delete_table_with_replicas<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    handle: &ResourceHandle,
    table_name: &str,
) -> Result<()> {
    require_table(driver, table_name).await?;
    driver.delete_and_await_absent(handle, table_name).await
}

/// A replicated table without NEW_AND_OLD_IMAGES streams is rejected with a
/// terminal condition carrying the expected reason.
pub async fn terminal_condition_for_invalid_stream_specification<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
    handle: &ResourceHandle,
    table_name: &str,
) -> Result<()> {
    require_table(driver, table_name).await?;
    driver.await_terminal_condition(handle).await?;
    Ok(())
}

/// Desired state for the shared replicated table.
pub fn replicated_table<C: ControlPlane, T: TableStatusApi>(driver: &ScenarioDriver<C, T>) -> Table {
    let cfg = driver.config();
    let name = random_suffix_name(&cfg.table_name_prefix, NAME_MAX_LEN);
    table_with_replicas(&name, &cfg.namespace, &[cfg.replica_region_1.as_str()])
}

/// Desired state for the invalid-stream table.
pub fn invalid_table<C: ControlPlane, T: TableStatusApi>(driver: &ScenarioDriver<C, T>) -> Table {
    let cfg = driver.config();
    let prefix = format!("{}-invalid", cfg.table_name_prefix);
    let name = random_suffix_name(&prefix, NAME_MAX_LEN);
    table_with_invalid_replicas(&name, &cfg.namespace, &cfg.replica_region_1)
}

/// Run every scenario and collect per-scenario results.  A failure does not
/// stop later scenarios; each one reports on its own.
pub async fn run_all<C: ControlPlane, T: TableStatusApi>(
    driver: &ScenarioDriver<C, T>,
) -> Vec<ScenarioResult> {
    let mut results = Vec::new();

    let table = replicated_table(driver);
    let table_name = table.spec.table_name.clone();
    let shared = driver
        .with_table(&table, |handle| async move {
            let tn = table_name.as_str();
            Ok(vec![
                timed("create_table_with_replica", create_table_with_replica(driver, tn)).await,
                timed("add_replica", add_replica(driver, &handle, tn)).await,
                timed("remove_replica", remove_replica(driver, &handle, tn)).await,
                timed(
                    "delete_table_with_replicas",
                    delete_table_with_replicas(driver, &handle, tn),
                )
                .await,
            ])
        })
        .await;
    match shared {
        Ok(mut r) => results.append(&mut r),
        Err(e) => results.push(ScenarioResult {
            name: "table_with_replicas fixture",
            outcome: Err(e),
            elapsed: Duration::ZERO,
        }),
    }

    let invalid = invalid_table(driver);
    let invalid_name = invalid.spec.table_name.clone();
    let negative = driver
        .with_table(&invalid, |handle| async move {
            Ok(timed(
                "terminal_condition_for_invalid_stream_specification",
                terminal_condition_for_invalid_stream_specification(driver, &handle, &invalid_name),
            )
            .await)
        })
        .await;
    match negative {
        Ok(r) => results.push(r),
        Err(e) => results.push(ScenarioResult {
            name: "table_with_invalid_replicas fixture",
            outcome: Err(e),
            elapsed: Duration::ZERO,
        }),
    }

    results
}
