use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value written into every numeric field of a sentinel snapshot.
pub const SENTINEL_VALUE: f64 = -1.0;

/// One timestamped reading of the host's CPU, memory, disk and network counters.
///
/// Serialized with camelCase field names; this is the line format of the live
/// stream, the staging log and the log sink payload.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use hostmon_common::types::Snapshot;
///
/// let snapshot = Snapshot::sentinel(Utc::now());
/// assert!(snapshot.is_sentinel());
/// assert_eq!(snapshot.cpu_usage, -1.0);
/// assert!(snapshot.net_in_bps_by_interface.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage: f64,
    pub memory_used_percent: f64,
    pub disk_read_bps: f64,
    pub disk_write_bps: f64,
    /// Inbound bytes/sec keyed by adapter friendly name.
    #[serde(default)]
    pub net_in_bps_by_interface: HashMap<String, f64>,
    /// Outbound bytes/sec keyed by adapter friendly name.
    #[serde(default)]
    pub net_out_bps_by_interface: HashMap<String, f64>,
}

impl Snapshot {
    /// Snapshot signalling that collection failed at `timestamp`.
    pub fn sentinel(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            cpu_usage: SENTINEL_VALUE,
            memory_used_percent: SENTINEL_VALUE,
            disk_read_bps: SENTINEL_VALUE,
            disk_write_bps: SENTINEL_VALUE,
            net_in_bps_by_interface: HashMap::new(),
            net_out_bps_by_interface: HashMap::new(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.cpu_usage == SENTINEL_VALUE
            && self.memory_used_percent == SENTINEL_VALUE
            && self.disk_read_bps == SENTINEL_VALUE
            && self.disk_write_bps == SENTINEL_VALUE
            && self.net_in_bps_by_interface.is_empty()
            && self.net_out_bps_by_interface.is_empty()
    }

    /// Serialize to a single JSON line without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Round to 2 decimal places.
///
/// # Examples
///
/// ```
/// use hostmon_common::types::round2;
///
/// assert_eq!(round2(12.3456), 12.35);
/// assert_eq!(round2(-1.0), -1.0);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Snapshot {
        let mut net_in = HashMap::new();
        net_in.insert("Ethernet".to_string(), 1024.5);
        net_in.insert("Wi-Fi 2".to_string(), 0.0);
        let mut net_out = HashMap::new();
        net_out.insert("Ethernet".to_string(), 512.25);
        Snapshot {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 15).unwrap(),
            cpu_usage: 37.42,
            memory_used_percent: 61.09,
            disk_read_bps: 20480.0,
            disk_write_bps: 4096.75,
            net_in_bps_by_interface: net_in,
            net_out_bps_by_interface: net_out,
        }
    }

    #[test]
    fn json_line_parses_back_to_equal_snapshot() {
        let snapshot = sample();
        let line = snapshot.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let parsed: Snapshot = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn json_uses_camel_case_schema() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "timestamp",
            "cpuUsage",
            "memoryUsedPercent",
            "diskReadBps",
            "diskWriteBps",
            "netInBpsByInterface",
            "netOutBpsByInterface",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj.len(), 7);
        assert_eq!(value["timestamp"], "2024-03-01T12:30:15Z");
        assert_eq!(value["netInBpsByInterface"]["Ethernet"], 1024.5);
    }

    #[test]
    fn sentinel_has_negative_values_and_empty_maps() {
        let snapshot = Snapshot::sentinel(Utc::now());
        assert!(snapshot.is_sentinel());
        assert_eq!(snapshot.memory_used_percent, -1.0);
        assert_eq!(snapshot.disk_read_bps, -1.0);
        assert_eq!(snapshot.disk_write_bps, -1.0);
        assert!(snapshot.net_out_bps_by_interface.is_empty());
        assert!(!sample().is_sentinel());
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(99.994), 99.99);
        assert_eq!(round2(100.0), 100.0);
    }
}
