//! Host counter access for the hostmon agent.
//!
//! The agent only talks to the host through the [`MetricSource`] trait.
//! [`system::SysinfoSource`] reads real counters via `sysinfo`;
//! [`fake::FakeSource`] replays scripted readings for tests.

pub mod cpu;
pub mod disk;
pub mod fake;
pub mod memory;
pub mod names;
pub mod network;
pub mod system;

use anyhow::Result;
use std::collections::HashMap;

/// Raw counter values from one read of every host counter.
///
/// Network rates are keyed by the raw counter instance name; the sampler
/// resolves them to friendly names through [`names::InterfaceNameMap`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterReading {
    pub cpu_usage: f64,
    pub available_mb: f64,
    pub disk_read_bps: f64,
    pub disk_write_bps: f64,
    pub net_in_bps: HashMap<String, f64>,
    pub net_out_bps: HashMap<String, f64>,
}

/// A network adapter discovered during host enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAdapter {
    /// Human-readable adapter name (e.g. `"Ethernet"`, `"eth0"`).
    pub name: String,
    /// Adapter description; the counter instance name is derived from it.
    pub description: String,
    pub is_loopback: bool,
}

/// Capability interface over the host's counter and enumeration APIs.
///
/// Rate counters are stateful: the first [`read`](MetricSource::read) after
/// construction only primes them and its values should be discarded.
pub trait MetricSource: Send {
    /// Returns the source name, used for logging.
    fn name(&self) -> &str;

    /// Total physical memory in megabytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not report physical memory.
    fn total_physical_mb(&mut self) -> Result<f64>;

    /// Reads every counter once.
    ///
    /// # Errors
    ///
    /// Returns an error if any underlying counter read fails.
    fn read(&mut self) -> Result<CounterReading>;

    /// Enumerates the host's network adapters.
    ///
    /// # Errors
    ///
    /// Returns an error if adapter enumeration fails.
    fn network_adapters(&mut self) -> Result<Vec<NetworkAdapter>>;
}

/// The OS host name, or `"unknown-host"` when it cannot be resolved.
pub fn host_name() -> String {
    sysinfo::System::host_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown-host".to_string())
}
