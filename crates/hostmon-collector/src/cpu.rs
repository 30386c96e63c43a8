use anyhow::{bail, Result};
use sysinfo::System;

/// Which CPU view to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuSource {
    /// Aggregate usage across the host.
    Total,
    /// Mean of every logical processor, the view a hypervisor host reports.
    LogicalProcessors,
}

impl CpuSource {
    pub fn from_hyper_v(hyper_v: bool) -> Self {
        if hyper_v {
            CpuSource::LogicalProcessors
        } else {
            CpuSource::Total
        }
    }
}

pub struct CpuReader {
    system: System,
    source: CpuSource,
}

impl CpuReader {
    pub fn new(source: CpuSource) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system, source }
    }

    /// CPU usage in percent since the previous read.
    pub fn read(&mut self) -> Result<f64> {
        self.system.refresh_cpu_all();
        match self.source {
            CpuSource::Total => Ok(f64::from(self.system.global_cpu_usage())),
            CpuSource::LogicalProcessors => {
                let cpus = self.system.cpus();
                if cpus.is_empty() {
                    bail!("no logical processors reported");
                }
                let sum: f64 = cpus.iter().map(|cpu| f64::from(cpu.cpu_usage())).sum();
                Ok(sum / cpus.len() as f64)
            }
        }
    }
}
