//! Deterministic [`MetricSource`] for tests.

use crate::{CounterReading, MetricSource, NetworkAdapter};
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Replays scripted readings in order, then repeats a steady reading.
///
/// # Examples
///
/// ```
/// use hostmon_collector::fake::FakeSource;
/// use hostmon_collector::MetricSource;
///
/// let mut source = FakeSource::new(8192.0).push_failure("counter gone");
/// assert!(source.read().is_err());
/// assert!(source.read().is_ok());
/// assert_eq!(source.reads(), 2);
/// ```
pub struct FakeSource {
    total_physical_mb: Option<f64>,
    adapters: Vec<NetworkAdapter>,
    script: VecDeque<std::result::Result<CounterReading, String>>,
    steady: CounterReading,
    reads: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(total_physical_mb: f64) -> Self {
        Self {
            total_physical_mb: Some(total_physical_mb),
            adapters: Vec::new(),
            script: VecDeque::new(),
            steady: CounterReading {
                available_mb: total_physical_mb / 2.0,
                ..CounterReading::default()
            },
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose physical memory query always fails.
    pub fn without_memory() -> Self {
        Self {
            total_physical_mb: None,
            ..Self::new(0.0)
        }
    }

    pub fn with_adapters(mut self, adapters: Vec<NetworkAdapter>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_steady(mut self, reading: CounterReading) -> Self {
        self.steady = reading;
        self
    }

    pub fn push_reading(mut self, reading: CounterReading) -> Self {
        self.script.push_back(Ok(reading));
        self
    }

    pub fn push_failure(mut self, message: &str) -> Self {
        self.script.push_back(Err(message.to_string()));
        self
    }

    /// Number of `read` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Shared read counter that stays valid after the source is moved.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

impl MetricSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn total_physical_mb(&mut self) -> Result<f64> {
        self.total_physical_mb
            .ok_or_else(|| anyhow!("physical memory unavailable"))
    }

    fn read(&mut self) -> Result<CounterReading> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(Ok(reading)) => Ok(reading),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(self.steady.clone()),
        }
    }

    fn network_adapters(&mut self) -> Result<Vec<NetworkAdapter>> {
        Ok(self.adapters.clone())
    }
}
