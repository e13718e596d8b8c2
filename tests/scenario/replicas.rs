use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use super::common::*;
use table_replica_e2e::control_plane::ControlPlane;
use table_replica_e2e::driver::check_replicas;
use table_replica_e2e::error::Error;
use table_replica_e2e::observed::{ReplicaDescriptor, ReplicaState, TableSnapshot, TableState};
use table_replica_e2e::scenarios::{self, replicated_table};

fn snapshot(replicas: &[(&str, ReplicaState)]) -> TableSnapshot {
    TableSnapshot::new(
        "orders",
        Some(TableState::Active),
        replicas
            .iter()
            .map(|(region, s)| ReplicaDescriptor::new(*region, s.clone()))
            .collect(),
    )
    .unwrap()
}

fn mismatch_message(err: Error) -> String {
    match err {
        Error::ConvergenceMismatch { message, .. } => message,
        other => panic!("expected ConvergenceMismatch, got {other:?}"),
    }
}

// ── Strict post-check ───────────────────────────────────────────────────────

#[test]
fn check_accepts_exact_match_in_any_order() {
    let s = snapshot(&[(R2, ReplicaState::Active), (R1, ReplicaState::Active)]);
    check_replicas(Some(&s), &[R1, R2], Some(&ReplicaState::Active)).unwrap();
}

#[test]
fn check_rejects_missing_table() {
    let msg = mismatch_message(check_replicas(None, &[R1], None).unwrap_err());
    assert!(msg.contains("does not exist"), "{msg}");
}

#[test]
fn check_rejects_wrong_count() {
    let s = snapshot(&[(R1, ReplicaState::Active), (R2, ReplicaState::Active)]);
    let msg = mismatch_message(check_replicas(Some(&s), &[R1], None).unwrap_err());
    assert!(msg.contains("expected 1 replica(s), found 2"), "{msg}");
}

#[test]
fn check_rejects_wrong_region() {
    let s = snapshot(&[(R1, ReplicaState::Active), ("ap-south-1", ReplicaState::Active)]);
    let msg = mismatch_message(check_replicas(Some(&s), &[R1, R2], None).unwrap_err());
    assert!(msg.contains("ap-south-1"), "{msg}");
}

#[test]
fn check_rejects_replica_in_wrong_status() {
    let s = snapshot(&[(R1, ReplicaState::Active), (R2, ReplicaState::Creating)]);
    let msg = mismatch_message(check_replicas(Some(&s), &[R1, R2], Some(&ReplicaState::Active)).unwrap_err());
    assert_eq!(msg, format!("replica {R2} has status CREATING, expected ACTIVE"));
}

#[test]
fn check_without_status_ignores_replica_status() {
    let s = snapshot(&[(R1, ReplicaState::Updating)]);
    check_replicas(Some(&s), &[R1], None).unwrap();
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn replica_set_grows_and_shrinks() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(3);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);
    let tn = table.spec.table_name.clone();

    let handle = driver.create_table(&table).await?;

    scenarios::create_table_with_replica(driver, &tn).await?;
    scenarios::add_replica(driver, &handle, &tn).await?;
    let both = driver.assert_replicas(&tn, &[R1, R2], Some(&ReplicaState::Active)).await?;
    assert_eq!(both.replicas().len(), 2);

    scenarios::remove_replica(driver, &handle, &tn).await?;
    let one = driver.assert_replicas(&tn, &[R1], None).await?;
    assert!(one.replica(R2).is_none());

    scenarios::delete_table_with_replicas(driver, &handle, &tn).await?;
    assert!(!cloud.table_exists(&tn));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replica_update_keeps_fields_it_does_not_model() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let mut table = replicated_table(driver);
    table.spec.replicas[0]
        .extra
        .insert("kmsMasterKeyId".into(), json!("alias/replica-key"));

    let handle = driver.create_table(&table).await?;
    driver.add_replica(&handle, R2).await?;

    let stored = cloud.resource(&handle.name).expect("resource exists");
    assert_eq!(stored.spec.extra.get("tableClass"), Some(&json!("STANDARD")));
    let regions: Vec<_> = stored.spec.replicas.iter().map(|r| r.region_name.as_str()).collect();
    assert_eq!(regions, [R1, R2]);
    assert_eq!(
        stored.spec.replicas[0].extra.get("kmsMasterKeyId"),
        Some(&json!("alias/replica-key"))
    );

    // set_replicas keeps the existing entry rather than rebuilding it.
    driver.set_replicas(&handle, &[R1]).await?;
    let stored = cloud.resource(&handle.name).expect("resource exists");
    assert_eq!(stored.spec.replicas.len(), 1);
    assert!(stored.spec.replicas[0].extra.contains_key("kmsMasterKeyId"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn add_replica_is_idempotent() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);

    let handle = driver.create_table(&table).await?;
    let updated = driver.add_replica(&handle, R1).await?;
    assert_eq!(updated.spec.replicas.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn update_of_missing_resource_is_not_found() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);

    let handle = driver.create_table(&table).await?;
    driver.control_plane().delete(&handle).await?;

    let err = driver.add_replica(&handle, R2).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    assert_eq!(cloud.replace_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stale_write_is_rejected_by_the_api_server() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);

    let handle = driver.create_table(&table).await?;
    let stale = driver.control_plane().get(&handle).await?.expect("resource exists");
    cloud.bump_resource_version(&handle.name);

    let err = driver.control_plane().replace(&handle, &stale).await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");

    // The driver always writes against the latest revision.
    driver.add_replica(&handle, R2).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stuck_replica_times_out_with_last_observed_state() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    cloud.set_behaviour(R2, ReplicaBehaviour::Stuck);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);
    let tn = table.spec.table_name.clone();

    let handle = driver.create_table(&table).await?;
    scenarios::create_table_with_replica(driver, &tn).await?;

    let err = scenarios::add_replica(driver, &handle, &tn).await.unwrap_err();
    match err {
        Error::ConvergenceTimeout {
            description,
            elapsed,
            last_observed,
        } => {
            assert!(description.contains(&format!("replica {R2} has status ACTIVE")), "{description}");
            assert!(elapsed >= Duration::from_secs(120));
            assert!(last_observed.contains("Creating"), "{last_observed}");
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replica_settling_in_another_state_never_converges() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    cloud.set_behaviour(
        R1,
        ReplicaBehaviour::SettleAs(ReplicaState::from("INACCESSIBLE_ENCRYPTION_CREDENTIALS")),
    );
    let driver = &driver(&cloud);
    let table = replicated_table(driver);
    let tn = table.spec.table_name.clone();

    driver.create_table(&table).await?;
    let err = scenarios::create_table_with_replica(driver, &tn).await.unwrap_err();
    assert!(matches!(err, Error::ConvergenceTimeout { .. }), "got {err:?}");

    // The region set did converge; only the status check fails strictly.
    let err = driver
        .assert_replicas(&tn, &[R1], Some(&ReplicaState::Active))
        .await
        .unwrap_err();
    let msg = mismatch_message(err);
    assert!(msg.contains("INACCESSIBLE_ENCRYPTION_CREDENTIALS"), "{msg}");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn scenario_on_missing_table_fails_fast() {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);

    let err = scenarios::create_table_with_replica(driver, "never-created")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    assert_eq!(cloud.describe_calls.load(Ordering::SeqCst), 1);
}
