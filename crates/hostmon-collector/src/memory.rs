use anyhow::{bail, Result};
use sysinfo::System;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct MemoryReader {
    system: System,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    pub fn total_physical_mb(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            bail!("host reported zero physical memory");
        }
        Ok(total as f64 / BYTES_PER_MB)
    }

    pub fn available_mb(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        if self.system.total_memory() == 0 {
            bail!("memory counters unavailable");
        }
        Ok(self.system.available_memory() as f64 / BYTES_PER_MB)
    }
}

impl Default for MemoryReader {
    fn default() -> Self {
        Self::new()
    }
}
