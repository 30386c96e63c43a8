use anyhow::Result;
use std::collections::HashSet;
use std::time::Instant;
use sysinfo::Disks;

/// Host-wide disk throughput.
///
/// `sysinfo` reports bytes moved since the previous refresh, so rates are
/// that delta over the wall time between refreshes.
pub struct DiskReader {
    disks: Disks,
    last_refresh: Instant,
}

impl DiskReader {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            last_refresh: Instant::now(),
        }
    }

    /// Returns `(read_bps, write_bps)` summed over physical devices.
    pub fn read(&mut self) -> Result<(f64, f64)> {
        self.disks.refresh(true);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;

        let mut seen = HashSet::new();
        let mut read_bytes = 0u64;
        let mut written_bytes = 0u64;
        // Several mount points can share one device.
        for disk in self.disks.iter() {
            if !seen.insert(disk.name().to_os_string()) {
                continue;
            }
            let usage = disk.usage();
            read_bytes = read_bytes.saturating_add(usage.read_bytes);
            written_bytes = written_bytes.saturating_add(usage.written_bytes);
        }

        if elapsed <= 0.0 {
            return Ok((0.0, 0.0));
        }
        Ok((read_bytes as f64 / elapsed, written_bytes as f64 / elapsed))
    }
}

impl Default for DiskReader {
    fn default() -> Self {
        Self::new()
    }
}
