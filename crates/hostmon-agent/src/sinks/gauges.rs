use super::HostLabels;
use crate::error::Result;
use hostmon_common::types::Snapshot;
use parking_lot::Mutex;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

pub const CPU_USAGE: &str = "hostmon_cpu_usage_percent";
pub const MEMORY_USED: &str = "hostmon_memory_used_percent";
pub const DISK_READ: &str = "hostmon_disk_read_bytes_per_second";
pub const DISK_WRITE: &str = "hostmon_disk_write_bytes_per_second";
pub const NET_IN: &str = "hostmon_network_in_bytes_per_second";
pub const NET_OUT: &str = "hostmon_network_out_bytes_per_second";

const HOST_LABEL_NAMES: [&str; 4] = ["client", "region", "environment", "host"];
const INTERFACE_LABEL_NAMES: [&str; 5] = ["client", "region", "environment", "host", "interface"];

/// Identity of one gauge handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GaugeKey {
    pub metric: &'static str,
    pub labels: HostLabels,
    pub interface: Option<String>,
}

/// Gauge handles keyed by label tuple, created on first use and never
/// evicted. Backed by its own registry, not the process-global one.
pub struct GaugeCache {
    registry: Registry,
    cpu: GaugeVec,
    memory: GaugeVec,
    disk_read: GaugeVec,
    disk_write: GaugeVec,
    net_in: GaugeVec,
    net_out: GaugeVec,
    handles: Mutex<HashMap<GaugeKey, Gauge>>,
}

impl GaugeCache {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let host_gauge = |name: &str, help: &str| -> Result<GaugeVec> {
            let vec = GaugeVec::new(Opts::new(name, help), &HOST_LABEL_NAMES)?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };
        let cpu = host_gauge(CPU_USAGE, "CPU usage in percent")?;
        let memory = host_gauge(MEMORY_USED, "Physical memory in use, percent")?;
        let disk_read = host_gauge(DISK_READ, "Disk read throughput")?;
        let disk_write = host_gauge(DISK_WRITE, "Disk write throughput")?;

        let interface_gauge = |name: &str, help: &str| -> Result<GaugeVec> {
            let vec = GaugeVec::new(Opts::new(name, help), &INTERFACE_LABEL_NAMES)?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };
        let net_in = interface_gauge(NET_IN, "Inbound network throughput per adapter")?;
        let net_out = interface_gauge(NET_OUT, "Outbound network throughput per adapter")?;

        Ok(Self {
            registry,
            cpu,
            memory,
            disk_read,
            disk_write,
            net_in,
            net_out,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Sets every gauge for `snapshot`; the last write per key wins.
    pub fn update(&self, labels: &HostLabels, snapshot: &Snapshot) {
        self.set(&self.cpu, CPU_USAGE, labels, None, snapshot.cpu_usage);
        self.set(&self.memory, MEMORY_USED, labels, None, snapshot.memory_used_percent);
        self.set(&self.disk_read, DISK_READ, labels, None, snapshot.disk_read_bps);
        self.set(&self.disk_write, DISK_WRITE, labels, None, snapshot.disk_write_bps);
        for (interface, bps) in &snapshot.net_in_bps_by_interface {
            self.set(&self.net_in, NET_IN, labels, Some(interface), *bps);
        }
        for (interface, bps) in &snapshot.net_out_bps_by_interface {
            self.set(&self.net_out, NET_OUT, labels, Some(interface), *bps);
        }
    }

    fn set(
        &self,
        vec: &GaugeVec,
        metric: &'static str,
        labels: &HostLabels,
        interface: Option<&String>,
        value: f64,
    ) {
        let key = GaugeKey {
            metric,
            labels: labels.clone(),
            interface: interface.cloned(),
        };
        let mut handles = self.handles.lock();
        let gauge = handles.entry(key).or_insert_with_key(|key| {
            let mut values = vec![
                key.labels.client.as_str(),
                key.labels.region.as_str(),
                key.labels.environment.as_str(),
                key.labels.host.as_str(),
            ];
            if let Some(interface) = &key.interface {
                values.push(interface.as_str());
            }
            vec.with_label_values(values.as_slice())
        });
        gauge.set(value);
    }

    /// Number of distinct gauge handles created so far.
    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }

    /// Current value for a key, if its handle exists.
    pub fn value(&self, key: &GaugeKey) -> Option<f64> {
        self.handles.lock().get(key).map(Gauge::get)
    }

    /// Exposition-format text for the whole registry.
    pub fn encode(&self) -> Result<String> {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
