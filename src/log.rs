use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// One executed statement, as seen by log sinks.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub statement: String,
    pub elapsed: Duration,
    pub error: Option<String>,
}

/// Receives statement events off the request path.
///
/// Emission happens on a spawned task, so a slow sink delays other sinks
/// in the same batch but never the statement that produced the event.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: &LogEvent);
}

/// Sink that forwards events to the `tracing` subscriber at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, event: &LogEvent) {
        tracing::debug!(
            statement = %event.statement,
            elapsed_us = event.elapsed.as_micros() as u64,
            error = event.error.as_deref(),
            "statement executed"
        );
    }
}

/// Fans an event out to every sink without blocking the caller.
pub(crate) fn dispatch(sinks: &Arc<Vec<Arc<dyn LogSink>>>, event: LogEvent) {
    if sinks.is_empty() {
        return;
    }
    let sinks = Arc::clone(sinks);
    tokio::spawn(async move {
        for sink in sinks.iter() {
            sink.emit(&event);
        }
    });
}
