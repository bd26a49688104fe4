mod common;

use std::sync::Arc;

use common::RecordingDriver;
use sql_adapter::prelude::*;
use tokio_util::sync::CancellationToken;

/// Classifier that stamps everything it sees, so tests can tell whether a
/// failure passed through it and how often.
fn marking_config() -> AdapterConfig {
    AdapterConfig::mysql().with_classifier(|err| Error::Scan(format!("classified: {err}")))
}

fn boom() -> DriverError {
    DriverError::Execution("boom".to_owned())
}

fn assert_marked(err: &Error) {
    match err {
        Error::Scan(message) => assert_eq!(message, "classified: Execution error: boom"),
        other => panic!("expected classified error, got {other:?}"),
    }
}

/// Every operation hands its driver failure to the configured classifier
/// exactly once.
#[tokio::test(flavor = "current_thread")]
async fn all_operations_classify_driver_failures() {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(marking_config(), Arc::new(driver.clone()));

    driver.script_exec(Err(boom()));
    assert_marked(&adapter.exec("BAD", Vec::new()).await.unwrap_err());

    driver.script_exec(Err(boom()));
    let err = adapter
        .insert("users", &Changes::new().set("name", "a"))
        .await
        .unwrap_err();
    assert_marked(&err);

    driver.script_exec(Err(boom()));
    let err = adapter
        .insert_all("users", &["name"], &[Changes::new().set("name", "a")])
        .await
        .unwrap_err();
    assert_marked(&err);

    driver.script_exec(Err(boom()));
    let err = adapter
        .update("users", &Changes::new().set("name", "b"), &Filter::none())
        .await
        .unwrap_err();
    assert_marked(&err);

    driver.script_exec(Err(boom()));
    assert_marked(&adapter.delete("users", &Filter::none()).await.unwrap_err());

    driver.script_query_failure(boom());
    assert_marked(&adapter.query(&Query::new("users")).await.unwrap_err());

    driver.script_query_failure(boom());
    let err = adapter
        .aggregate(&Query::new("users"), AggregateMode::Count, "*")
        .await
        .unwrap_err();
    assert_marked(&err);

    driver.script_begin(Err(boom()));
    assert_marked(&adapter.begin().await.unwrap_err());
}

/// Savepoint statements ride the same execution path, so their failures
/// are classified like any other statement.
#[tokio::test(flavor = "current_thread")]
async fn savepoint_failures_are_classified() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(marking_config(), Arc::new(driver.clone()));

    let tx = adapter.begin().await?;
    driver.script_exec(Err(boom()));
    assert_marked(&tx.begin().await.unwrap_err());

    let sp = tx.begin().await?;
    driver.script_exec(Err(boom()));
    assert_marked(&sp.commit().await.unwrap_err());
    Ok(())
}

/// The misuse and cancellation kinds are raised locally and never go
/// through the classifier.
#[tokio::test(flavor = "current_thread")]
async fn local_kinds_bypass_the_classifier() {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(marking_config(), Arc::new(driver.clone()));
    let err = adapter.commit().await.unwrap_err();
    assert!(matches!(err, Error::NoActiveTransaction));

    let token = CancellationToken::new();
    token.cancel();
    let adapter = Adapter::new(marking_config(), Arc::new(common::HangingDriver))
        .with_cancellation(token);
    let err = adapter.exec("SELECT 1", Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

/// Without a custom classifier, driver failures surface as `Error::Driver`
/// with the driver's message intact.
#[tokio::test(flavor = "current_thread")]
async fn default_classifier_passes_failures_through() {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()));

    driver.script_exec(Err(boom()));
    let err = adapter.exec("BAD", Vec::new()).await.unwrap_err();
    assert!(matches!(err, Error::Driver(_)));
    assert_eq!(err.to_string(), "Execution error: boom");
}
