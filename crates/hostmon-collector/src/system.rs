use crate::cpu::{CpuReader, CpuSource};
use crate::disk::DiskReader;
use crate::memory::MemoryReader;
use crate::network::NetworkReader;
use crate::{CounterReading, MetricSource, NetworkAdapter};
use anyhow::{Context, Result};

/// Production [`MetricSource`] backed by `sysinfo`.
pub struct SysinfoSource {
    cpu: CpuReader,
    memory: MemoryReader,
    disk: DiskReader,
    network: NetworkReader,
}

impl SysinfoSource {
    pub fn new(cpu_source: CpuSource) -> Self {
        Self {
            cpu: CpuReader::new(cpu_source),
            memory: MemoryReader::new(),
            disk: DiskReader::new(),
            network: NetworkReader::new(),
        }
    }
}

impl MetricSource for SysinfoSource {
    fn name(&self) -> &str {
        "sysinfo"
    }

    fn total_physical_mb(&mut self) -> Result<f64> {
        self.memory.total_physical_mb()
    }

    fn read(&mut self) -> Result<CounterReading> {
        let cpu_usage = self.cpu.read().context("cpu counter")?;
        let available_mb = self.memory.available_mb().context("memory counter")?;
        let (disk_read_bps, disk_write_bps) = self.disk.read().context("disk counters")?;
        let (net_in_bps, net_out_bps) = self.network.read().context("network counters")?;
        Ok(CounterReading {
            cpu_usage,
            available_mb,
            disk_read_bps,
            disk_write_bps,
            net_in_bps,
            net_out_bps,
        })
    }

    fn network_adapters(&mut self) -> Result<Vec<NetworkAdapter>> {
        let adapters = self.network.adapters();
        tracing::debug!(
            count = adapters.len(),
            loopback = adapters.iter().filter(|a| a.is_loopback).count(),
            "Enumerated network adapters"
        );
        Ok(adapters)
    }
}
