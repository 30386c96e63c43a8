use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use chrono::{DateTime, Utc};
use hostmon_collector::names::InterfaceNameMap;
use hostmon_collector::{CounterReading, MetricSource};
use hostmon_common::types::{round2, Snapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Turns counter reads into snapshots, one per tick.
pub struct Sampler {
    source: Box<dyn MetricSource>,
    names: InterfaceNameMap,
    total_physical_mb: f64,
}

impl Sampler {
    /// Resolves physical memory and adapter names, then primes the rate
    /// counters with a discarded read.
    pub fn new(mut source: Box<dyn MetricSource>) -> Self {
        let total_physical_mb = match source.total_physical_mb() {
            Ok(mb) => mb,
            Err(e) => {
                tracing::error!(
                    source = source.name(),
                    error = %e,
                    "Cannot resolve physical memory, snapshots will be sentinels"
                );
                0.0
            }
        };

        let names = match source.network_adapters() {
            Ok(adapters) => InterfaceNameMap::build(&adapters),
            Err(e) => {
                tracing::warn!(error = %e, "Adapter enumeration failed, using raw interface names");
                InterfaceNameMap::default()
            }
        };

        if let Err(e) = source.read() {
            tracing::warn!(source = source.name(), error = %e, "Warm-up read failed");
        }

        tracing::info!(
            source = source.name(),
            total_physical_mb,
            adapters = names.len(),
            "Sampler initialised"
        );

        Self {
            source,
            names,
            total_physical_mb,
        }
    }

    /// Reads every counter once. Never fails: a bad read yields a sentinel.
    pub fn sample(&mut self) -> Snapshot {
        let timestamp = Utc::now();
        match self.try_sample(timestamp) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Sampling failed, emitting sentinel snapshot");
                Snapshot::sentinel(timestamp)
            }
        }
    }

    fn try_sample(&mut self, timestamp: DateTime<Utc>) -> Result<Snapshot> {
        if self.total_physical_mb <= 0.0 {
            return Err(AgentError::SourceRead(
                "total physical memory unknown".to_string(),
            ));
        }

        let reading = self
            .source
            .read()
            .map_err(|e| AgentError::SourceRead(format!("{e:#}")))?;
        check_finite(&reading)?;

        let used = 100.0 - (reading.available_mb / self.total_physical_mb * 100.0);
        Ok(Snapshot {
            timestamp,
            cpu_usage: round2(reading.cpu_usage),
            memory_used_percent: round2(used.clamp(0.0, 100.0)),
            disk_read_bps: round2(reading.disk_read_bps),
            disk_write_bps: round2(reading.disk_write_bps),
            net_in_bps_by_interface: self.by_friendly_name(&reading.net_in_bps),
            net_out_bps_by_interface: self.by_friendly_name(&reading.net_out_bps),
        })
    }

    fn by_friendly_name(&self, rates: &HashMap<String, f64>) -> HashMap<String, f64> {
        rates
            .iter()
            .filter_map(|(instance, bps)| {
                self.names
                    .resolve(instance)
                    .map(|name| (name.to_string(), round2(*bps)))
            })
            .collect()
    }

    /// Samples every `sample_interval` until shutdown. Each snapshot is
    /// enqueued for the next flush and published to the live stream.
    pub async fn run(mut self, ctx: Arc<AgentContext>) {
        let period = ctx.config.sample_interval();
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_ms = period.as_millis() as u64, "Sampling loop started");
        loop {
            tokio::select! {
                _ = ctx.shutdown.cancelled() => break,
                _ = tick.tick() => {
                    let snapshot = Arc::new(self.sample());
                    tracing::debug!(
                        cpu = snapshot.cpu_usage,
                        memory = snapshot.memory_used_percent,
                        "Sampled"
                    );
                    ctx.buffer.enqueue(snapshot.as_ref().clone());
                    ctx.live.send_replace(Some(snapshot));
                }
            }
        }
        tracing::info!("Sampling loop stopped");
    }
}

fn check_finite(reading: &CounterReading) -> Result<()> {
    let scalars = [
        ("cpu", reading.cpu_usage),
        ("available_mb", reading.available_mb),
        ("disk_read", reading.disk_read_bps),
        ("disk_write", reading.disk_write_bps),
    ];
    let rates = reading.net_in_bps.values().chain(reading.net_out_bps.values());
    if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
        return Err(AgentError::SourceRead(format!("{name} counter is not finite")));
    }
    if rates.into_iter().any(|v| !v.is_finite()) {
        return Err(AgentError::SourceRead(
            "network counter is not finite".to_string(),
        ));
    }
    Ok(())
}
