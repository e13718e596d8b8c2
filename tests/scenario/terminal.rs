use super::common::*;
use table_replica_e2e::config::INVALID_STREAM_MESSAGE;
use table_replica_e2e::error::Error;
use table_replica_e2e::scenarios::{self, invalid_table, replicated_table};

#[tokio::test(start_paused = true)]
async fn invalid_stream_specification_goes_terminal() -> anyhow::Result<()> {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let table = invalid_table(driver);
    let tn = table.spec.table_name.clone();
    assert!(tn.contains("-invalid-"), "{tn}");

    let message = driver
        .with_table(&table, |handle| async move { driver.await_terminal_condition(&handle).await })
        .await?;
    assert!(message.contains(INVALID_STREAM_MESSAGE), "{message}");

    driver
        .with_table(&table, |handle| async move {
            scenarios::terminal_condition_for_invalid_stream_specification(driver, &handle, &tn).await
        })
        .await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn terminal_condition_with_other_reason_fails() {
    let cloud = SimulatedCloud::new(2);
    cloud.set_terminal_message("ValidationException: One or more parameter values were invalid");
    let driver = &driver(&cloud);
    let table = invalid_table(driver);

    let err = driver
        .with_table(&table, |handle| async move { driver.await_terminal_condition(&handle).await })
        .await
        .unwrap_err();

    match err {
        Error::UnexpectedTerminalReason { actual, expected, .. } => {
            assert!(actual.starts_with("ValidationException"));
            assert_eq!(expected, INVALID_STREAM_MESSAGE);
        }
        other => panic!("expected UnexpectedTerminalReason, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn valid_table_never_goes_terminal() {
    let cloud = SimulatedCloud::new(2);
    let driver = &driver(&cloud);
    let table = replicated_table(driver);

    let err = driver
        .with_table(&table, |handle| async move { driver.await_terminal_condition(&handle).await })
        .await
        .unwrap_err();

    match err {
        Error::TerminalConditionNeverAppeared { condition_type, elapsed, .. } => {
            assert_eq!(condition_type, "ACK.Terminal");
            assert!(elapsed >= std::time::Duration::from_secs(60));
        }
        other => panic!("expected TerminalConditionNeverAppeared, got {other:?}"),
    }
}
