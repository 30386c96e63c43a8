//! Remote destinations for flushed snapshots.

pub mod gauges;
pub mod loki;
pub mod pushgateway;

use crate::error::Result;
use async_trait::async_trait;
use hostmon_common::types::Snapshot;

/// Longest response body kept in a [`crate::error::AgentError::SinkStatus`].
pub(crate) const MAX_ERROR_BODY: usize = 512;

/// Labels identifying this host in both sinks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostLabels {
    pub client: String,
    pub region: String,
    pub environment: String,
    pub host: String,
}

/// Receives every flushed snapshot as one log line.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Ships one snapshot; `line` is its JSON serialization.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success response.
    async fn push(&self, snapshot: &Snapshot, line: &str) -> Result<()>;
}

/// Keeps gauges for the latest snapshot values and pushes them upstream.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Overwrites the gauges for this snapshot's label tuples.
    fn record(&self, snapshot: &Snapshot);

    /// Pushes the full gauge state.
    ///
    /// # Errors
    ///
    /// Returns an error on encoding failure, transport failure or a
    /// non-success response.
    async fn push(&self) -> Result<()>;
}

pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
