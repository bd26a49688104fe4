mod common;

use std::sync::Arc;

use common::RecordingDriver;
use sql_adapter::driver::ExecResult;
use sql_adapter::prelude::*;

fn exec_result(last_insert_id: i64, rows_affected: u64) -> ExecResult {
    ExecResult {
        last_insert_id,
        rows_affected,
    }
}

/// A multi-row insert runs as one statement; the store reports the first
/// generated id and the rest are predicted by stepping it.
#[tokio::test(flavor = "current_thread")]
async fn ids_step_from_the_first_generated_key() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()));
    driver.script_exec(Ok(exec_result(10, 3)));

    let rows = vec![
        Changes::new().set("name", "a"),
        Changes::new().set("name", "b"),
        Changes::new().set("name", "c"),
    ];
    let ids = adapter.insert_all("users", &["name"], &rows).await?;
    assert_eq!(ids, vec![10, 11, 12]);

    assert_eq!(
        driver.statements(),
        vec!["INSERT INTO `users` (`name`) VALUES (?), (?), (?)".to_owned()]
    );
    Ok(())
}

/// Stores with a configured auto-increment step scale the prediction.
#[tokio::test(flavor = "current_thread")]
async fn custom_increment_scales_the_prediction() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let config = AdapterConfig::mysql().with_increment_step(|| 5);
    let adapter = Adapter::new(config, Arc::new(driver.clone()));
    driver.script_exec(Ok(exec_result(10, 3)));

    let rows = vec![
        Changes::new().set("name", "a"),
        Changes::new().set("name", "b"),
        Changes::new().set("name", "c"),
    ];
    let ids = adapter.insert_all("users", &["name"], &rows).await?;
    assert_eq!(ids, vec![10, 15, 20]);
    Ok(())
}

/// One changeset degenerates to the plain single-insert result.
#[tokio::test(flavor = "current_thread")]
async fn single_changeset_yields_single_id() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()));
    driver.script_exec(Ok(exec_result(42, 1)));

    let ids = adapter
        .insert_all("users", &["name"], &[Changes::new().set("name", "only")])
        .await?;
    assert_eq!(ids, vec![42]);
    Ok(())
}

/// Plain insert reports the store's generated id directly.
#[tokio::test(flavor = "current_thread")]
async fn insert_returns_the_generated_id() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()));
    driver.script_exec(Ok(exec_result(7, 1)));

    let id = adapter
        .insert("users", &Changes::new().set("name", "alice"))
        .await?;
    assert_eq!(id, 7);
    Ok(())
}

/// Changesets missing a listed field fall back to the column default.
#[tokio::test(flavor = "current_thread")]
async fn missing_fields_insert_defaults() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    let adapter = Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()));

    let rows = vec![
        Changes::new().set("name", "a").set("age", 30),
        Changes::new().set("name", "b"),
    ];
    adapter.insert_all("users", &["name", "age"], &rows).await?;

    assert_eq!(
        driver.statements(),
        vec!["INSERT INTO `users` (`name`, `age`) VALUES (?, ?), (?, DEFAULT)".to_owned()]
    );
    Ok(())
}
