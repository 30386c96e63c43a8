use crate::NetworkAdapter;
use anyhow::Result;
use std::collections::HashMap;
use std::time::Instant;
use sysinfo::Networks;

pub struct NetworkReader {
    networks: Networks,
    last_refresh: Instant,
}

impl NetworkReader {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            last_refresh: Instant::now(),
        }
    }

    /// Returns per-interface `(in_bps, out_bps)` keyed by interface name.
    pub fn read(&mut self) -> Result<(HashMap<String, f64>, HashMap<String, f64>)> {
        self.networks.refresh(true);
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;

        let mut inbound = HashMap::new();
        let mut outbound = HashMap::new();
        for (name, data) in self.networks.iter() {
            let (rx, tx) = if elapsed > 0.0 {
                (
                    data.received() as f64 / elapsed,
                    data.transmitted() as f64 / elapsed,
                )
            } else {
                (0.0, 0.0)
            };
            inbound.insert(name.clone(), rx);
            outbound.insert(name.clone(), tx);
        }
        Ok((inbound, outbound))
    }

    pub fn adapters(&self) -> Vec<NetworkAdapter> {
        self.networks
            .iter()
            .map(|(name, data)| {
                let addrs = data.ip_networks();
                let is_loopback = name == "lo"
                    || name.starts_with("Loopback")
                    || (!addrs.is_empty() && addrs.iter().all(|net| net.addr.is_loopback()));
                NetworkAdapter {
                    name: name.clone(),
                    description: name.clone(),
                    is_loopback,
                }
            })
            .collect()
    }
}

impl Default for NetworkReader {
    fn default() -> Self {
        Self::new()
    }
}
