//! Convergence scenario driver.
//!
//! Every scenario step has the same shape: write desired state through the
//! control plane, poll the table status API until a predicate holds, then
//! re-check the full observed state strictly.  The predicate only decides
//! how long to wait; the strict check decides pass or fail and is never
//! retried.

use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::control_plane::{ControlPlane, ResourceHandle};
use crate::crd::table::{ReplicaSpec, Table};
use crate::error::{Error, Result};
use crate::observed::{ReplicaState, TableSnapshot};
use crate::poller::{poll, PollOutcome, PollPolicy};
use crate::predicate::{ConsumedByController, Predicate, ResourceAbsent};
use crate::table_status::TableStatusApi;
use crate::terminal::TerminalErrorDetector;

pub struct ScenarioDriver<C, T> {
    control_plane: C,
    tables: T,
    config: HarnessConfig,
}

impl<C: ControlPlane, T: TableStatusApi> ScenarioDriver<C, T> {
    pub fn new(control_plane: C, tables: T, config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            control_plane,
            tables,
            config,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    pub fn tables(&self) -> &T {
        &self.tables
    }

    // ── Resource lifecycle ──────────────────────────────────────────────────

    /// Create the resource and wait until the controller has picked it up.
    pub async fn create_table(&self, table: &Table) -> Result<ResourceHandle> {
        let handle = self.control_plane.create(table).await?;
        self.await_consumed(&handle).await?;
        Ok(handle)
    }

    async fn await_consumed(&self, handle: &ResourceHandle) -> Result<Table> {
        let policy = self.config.consumed_policy()?;
        let control_plane = &self.control_plane;
        let outcome = poll(&policy, move || control_plane.get(handle), &ConsumedByController).await?;
        outcome
            .into_converged(format!("{handle} consumed by controller"))?
            .ok_or_else(|| Error::NotFound(handle.to_string()))
    }

    /// Create `table`, run `body` against it, then tear it down.
    ///
    /// Teardown runs whether the body succeeds, fails or panics.  A teardown
    /// failure is logged; the body's own outcome is what gets returned.
    pub async fn with_table<F, Fut, R>(&self, table: &Table, body: F) -> Result<R>
    where
        F: FnOnce(ResourceHandle) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let handle = self.control_plane.create(table).await?;

        let outcome = AssertUnwindSafe(async {
            self.await_consumed(&handle).await?;
            body(handle.clone()).await
        })
        .catch_unwind()
        .await;

        if let Err(e) = self.teardown(&handle).await {
            warn!(resource = %handle, error = %e, "teardown failed");
        }

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Delete the resource if it is still there, then give the controller
    /// time to act on the deletion.
    pub async fn teardown(&self, handle: &ResourceHandle) -> Result<()> {
        if self.control_plane.get(handle).await?.is_none() {
            return Ok(());
        }
        self.control_plane.delete(handle).await?;
        tokio::time::sleep(std::time::Duration::from_secs(self.config.delete_settle_secs)).await;
        Ok(())
    }

    // ── Desired-state mutation ──────────────────────────────────────────────

    /// Read-modify-write of `spec.replicas` on the latest revision.  Fields
    /// the controller or other writers set are carried over untouched.
    pub async fn update_replicas<M>(&self, handle: &ResourceHandle, mutate: M) -> Result<Table>
    where
        M: FnOnce(&mut Vec<ReplicaSpec>),
    {
        let mut latest = self
            .control_plane
            .get(handle)
            .await?
            .ok_or_else(|| Error::NotFound(handle.to_string()))?;
        mutate(&mut latest.spec.replicas);
        self.control_plane.replace(handle, &latest).await?;

        let regions: Vec<&str> = latest.spec.replicas.iter().map(|r| r.region_name.as_str()).collect();
        info!(resource = %handle, ?regions, "updated replicas");
        Ok(latest)
    }

    /// Replace the replica list with exactly `regions`, keeping the existing
    /// entry (and its extra fields) for regions already present.
    pub async fn set_replicas(&self, handle: &ResourceHandle, regions: &[&str]) -> Result<Table> {
        self.update_replicas(handle, |replicas| {
            let next = regions
                .iter()
                .map(|region| {
                    replicas
                        .iter()
                        .find(|r| r.region_name == *region)
                        .cloned()
                        .unwrap_or_else(|| ReplicaSpec::new(*region))
                })
                .collect();
            *replicas = next;
        })
        .await
    }

    pub async fn add_replica(&self, handle: &ResourceHandle, region: &str) -> Result<Table> {
        self.update_replicas(handle, |replicas| {
            if !replicas.iter().any(|r| r.region_name == region) {
                replicas.push(ReplicaSpec::new(region));
            }
        })
        .await
    }

    pub async fn remove_replica(&self, handle: &ResourceHandle, region: &str) -> Result<Table> {
        self.update_replicas(handle, |replicas| replicas.retain(|r| r.region_name != region))
            .await
    }

    // ── Observation ─────────────────────────────────────────────────────────

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        Ok(self.tables.describe(table_name).await?.is_some())
    }

    pub async fn poll_table<P>(
        &self,
        table_name: &str,
        predicate: &P,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<TableSnapshot>>
    where
        P: Predicate<TableSnapshot> + ?Sized,
    {
        let tables = &self.tables;
        poll(policy, move || tables.describe(table_name), predicate).await
    }

    /// Poll until `predicate` holds; a missed deadline is
    /// [`Error::ConvergenceTimeout`].
    pub async fn await_table<P>(
        &self,
        table_name: &str,
        predicate: &P,
        policy: &PollPolicy,
    ) -> Result<Option<TableSnapshot>>
    where
        P: Predicate<TableSnapshot> + ?Sized,
    {
        self.poll_table(table_name, predicate, policy)
            .await?
            .into_converged(format!("table {table_name}: {}", predicate.description()))
    }

    /// Strict post-convergence check on a fresh snapshot.
    pub async fn assert_replicas(
        &self,
        table_name: &str,
        expected_regions: &[&str],
        expected_status: Option<&ReplicaState>,
    ) -> Result<TableSnapshot> {
        let snapshot = self.tables.describe(table_name).await?;
        check_replicas(snapshot.as_ref(), expected_regions, expected_status)?;
        snapshot.ok_or_else(|| Error::NotFound(format!("table {table_name}")))
    }

    /// Delete the resource and wait for the managed table to disappear.
    pub async fn delete_and_await_absent(&self, handle: &ResourceHandle, table_name: &str) -> Result<()> {
        self.control_plane.delete(handle).await?;
        let policy = self.config.replica_policy()?;
        self.await_table(table_name, &ResourceAbsent, &policy).await?;
        info!(resource = %handle, table = %table_name, "table deleted");
        Ok(())
    }

    /// Wait for the configured terminal condition; returns its message.
    pub async fn await_terminal_condition(&self, handle: &ResourceHandle) -> Result<String> {
        let policy = self.config.terminal_policy()?;
        let mut detector = TerminalErrorDetector::new(
            &self.config.terminal_condition_type,
            &self.config.terminal_message,
        );
        let control_plane = &self.control_plane;
        detector.await_terminal(&policy, move || control_plane.get(handle)).await
    }
}

/// Exact count, exact region set, and (when given) every replica in
/// `expected_status`.  Any deviation is a [`Error::ConvergenceMismatch`].
pub fn check_replicas(
    snapshot: Option<&TableSnapshot>,
    expected_regions: &[&str],
    expected_status: Option<&ReplicaState>,
) -> Result<()> {
    let Some(table) = snapshot else {
        return Err(Error::mismatch("table does not exist", snapshot));
    };

    let expected: BTreeSet<&str> = expected_regions.iter().copied().collect();
    let actual = table.region_names();

    if table.replicas().len() != expected.len() {
        return Err(Error::mismatch(
            format!(
                "expected {} replica(s), found {}",
                expected.len(),
                table.replicas().len()
            ),
            table,
        ));
    }
    if actual != expected {
        return Err(Error::mismatch(
            format!("expected replica regions {expected:?}, found {actual:?}"),
            table,
        ));
    }
    if let Some(status) = expected_status {
        if let Some(wrong) = table.replicas().iter().find(|r| r.status.as_ref() != Some(status)) {
            return Err(Error::mismatch(
                format!(
                    "replica {} has status {}, expected {status}",
                    wrong.region_name,
                    wrong.status.as_ref().map(ReplicaState::as_str).unwrap_or("<none>")
                ),
                table,
            ));
        }
    }
    Ok(())
}
