mod common;

use std::sync::Arc;

use common::RecordingDriver;
use sql_adapter::prelude::*;

fn adapter_over(driver: &RecordingDriver) -> Adapter {
    Adapter::new(AdapterConfig::mysql(), Arc::new(driver.clone()))
}

/// An integer aggregate comes back as-is, and the underlying row set is
/// released once the value is read.
#[tokio::test(flavor = "current_thread")]
async fn integer_aggregate_passes_through() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    driver.script_rows(&["sum"], vec![Ok(vec![Value::Int(41)])]);
    let adapter = adapter_over(&driver);

    let value = adapter
        .aggregate(&Query::new("users"), AggregateMode::Sum, "age")
        .await?;
    assert_eq!(value, 41);
    assert_eq!(driver.releases(), 1);
    assert_eq!(
        driver.statements(),
        vec!["SELECT SUM(`age`) AS `sum` FROM `users`"]
    );
    Ok(())
}

/// Aggregates over no matching rows come back as SQL `NULL`; the adapter
/// reports that as zero.
#[tokio::test(flavor = "current_thread")]
async fn null_aggregate_reads_as_zero() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    driver.script_rows(&["max"], vec![Ok(vec![Value::Null])]);
    let adapter = adapter_over(&driver);

    let value = adapter
        .aggregate(&Query::new("users"), AggregateMode::Max, "age")
        .await?;
    assert_eq!(value, 0);
    Ok(())
}

/// A result set with no rows at all is a malformed aggregate; the row set
/// is still released.
#[tokio::test(flavor = "current_thread")]
async fn zero_rows_is_a_scan_error() {
    let driver = RecordingDriver::new();
    driver.script_rows(&["count"], Vec::new());
    let adapter = adapter_over(&driver);

    let err = adapter
        .aggregate(&Query::new("users"), AggregateMode::Count, "*")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Scan(_)));
    assert_eq!(
        err.to_string(),
        "Row scan error: aggregate query returned no rows"
    );
    assert_eq!(driver.releases(), 1);
}

/// Non-integer aggregate values cannot be coerced and scan-fail.
#[tokio::test(flavor = "current_thread")]
async fn non_integer_aggregate_is_a_scan_error() {
    let driver = RecordingDriver::new();
    driver.script_rows(&["min"], vec![Ok(vec![Value::Text("ada".to_owned())])]);
    let adapter = adapter_over(&driver);

    let err = adapter
        .aggregate(&Query::new("users"), AggregateMode::Min, "name")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Scan(_)));
    assert!(err.to_string().contains("not an integer"));
    assert_eq!(driver.releases(), 1);
}

/// `*` is passed through unescaped and filters render into the WHERE
/// clause with bound arguments.
#[tokio::test(flavor = "current_thread")]
async fn count_star_renders_with_filters() -> Result<(), Error> {
    let driver = RecordingDriver::new();
    driver.script_rows(&["count"], vec![Ok(vec![Value::Int(2)])]);
    let adapter = adapter_over(&driver);

    let query = Query::new("users").filter(Filter::gt("age", 21));
    let value = adapter
        .aggregate(&query, AggregateMode::Count, "*")
        .await?;
    assert_eq!(value, 2);
    assert_eq!(
        driver.statements(),
        vec!["SELECT COUNT(*) AS `count` FROM `users` WHERE `age` > ?"]
    );
    Ok(())
}
