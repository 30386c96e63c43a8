use crate::buffer::SnapshotBuffer;
use crate::context::AgentContext;
use crate::error::Result;
use crate::sinks::{LogSink, MetricsSink};
use hostmon_common::types::Snapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Result of one flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Buffer was empty; nothing written, no sink called.
    Skipped,
    /// Staging write failed; the drained snapshots are gone.
    Aborted { dropped: usize },
    Completed {
        flushed: usize,
        staging_removed: bool,
    },
}

/// Periodically drains the buffer into the staging log and the sinks.
pub struct FlushScheduler {
    buffer: Arc<SnapshotBuffer>,
    log_sink: Arc<dyn LogSink>,
    metrics_sink: Arc<dyn MetricsSink>,
    staging_path: PathBuf,
    interval: Duration,
    shutdown: CancellationToken,
}

impl FlushScheduler {
    pub fn new(
        ctx: &AgentContext,
        log_sink: Arc<dyn LogSink>,
        metrics_sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            buffer: ctx.buffer.clone(),
            log_sink,
            metrics_sink,
            staging_path: ctx.config.staging_path.clone(),
            interval: ctx.config.flush_interval(),
            shutdown: ctx.shutdown.clone(),
        }
    }

    /// Flushes every interval until shutdown. A cycle in progress when
    /// shutdown fires runs to completion; no new cycle starts afterwards.
    pub async fn run(self) {
        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            staging = %self.staging_path.display(),
            "Flush scheduler started"
        );
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = tick.tick() => {
                    match self.flush_once().await {
                        FlushOutcome::Skipped => tracing::debug!("Buffer empty, flush skipped"),
                        FlushOutcome::Aborted { dropped } => {
                            tracing::warn!(dropped, "Flush cycle aborted");
                        }
                        FlushOutcome::Completed { flushed, staging_removed } => {
                            tracing::info!(flushed, staging_removed, "Flush cycle completed");
                        }
                    }
                }
            }
        }
        tracing::info!("Flush scheduler stopped");
    }

    pub async fn flush_once(&self) -> FlushOutcome {
        let batch = self.buffer.drain();
        if batch.is_empty() {
            return FlushOutcome::Skipped;
        }

        if let Err(e) = self.stage_and_ship(&batch).await {
            tracing::error!(
                error = %e,
                dropped = batch.len(),
                path = %self.staging_path.display(),
                "Staging log write failed, dropping this cycle"
            );
            return FlushOutcome::Aborted {
                dropped: batch.len(),
            };
        }

        if let Err(e) = self.metrics_sink.push().await {
            tracing::warn!(error = %e, "Metrics push failed");
        }

        let staging_removed = match secure_delete(&self.staging_path).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.staging_path.display(),
                    "Could not delete staging log, it will be appended to next cycle"
                );
                false
            }
        };

        FlushOutcome::Completed {
            flushed: batch.len(),
            staging_removed,
        }
    }

    /// Records gauges, appends one line per snapshot and ships it to the
    /// log sink. Only a staging write failure is returned.
    async fn stage_and_ship(&self, batch: &[Snapshot]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.staging_path)
            .await?;

        let mut log_failures = 0usize;
        for snapshot in batch {
            self.metrics_sink.record(snapshot);

            let line = match snapshot.to_json_line() {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, timestamp = %snapshot.timestamp, "Snapshot not serializable, skipped");
                    continue;
                }
            };
            let mut record = Vec::with_capacity(line.len() + 1);
            record.extend_from_slice(line.as_bytes());
            record.push(b'\n');
            file.write_all(&record).await?;

            if let Err(e) = self.log_sink.push(snapshot, &line).await {
                log_failures += 1;
                tracing::warn!(error = %e, timestamp = %snapshot.timestamp, "Log push failed");
            }
        }
        file.flush().await?;

        if log_failures > 0 {
            tracing::warn!(failed = log_failures, total = batch.len(), "Some log lines were not delivered");
        }
        Ok(())
    }
}

/// Truncates the file, then removes it.
async fn secure_delete(path: &Path) -> std::io::Result<()> {
    tokio::fs::write(path, b"").await?;
    tokio::fs::remove_file(path).await
}
