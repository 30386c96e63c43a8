use crate::NetworkAdapter;
use std::collections::{HashMap, HashSet};

/// Maps raw counter instance names to adapter friendly names.
///
/// Built once from host enumeration and read-only afterwards. Loopback
/// adapters are remembered so their counters can be dropped.
#[derive(Debug, Clone, Default)]
pub struct InterfaceNameMap {
    friendly: HashMap<String, String>,
    loopback: HashSet<String>,
}

impl InterfaceNameMap {
    pub fn build(adapters: &[NetworkAdapter]) -> Self {
        let mut map = Self::default();
        for adapter in adapters {
            let instance = counter_instance_name(&adapter.description);
            if adapter.is_loopback {
                map.loopback.insert(instance);
                continue;
            }
            map.friendly.insert(instance, adapter.name.clone());
        }
        map
    }

    /// Friendly name for a raw instance name, `None` for loopback adapters.
    ///
    /// Unknown instances resolve to the raw name itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostmon_collector::names::InterfaceNameMap;
    /// use hostmon_collector::NetworkAdapter;
    ///
    /// let map = InterfaceNameMap::build(&[NetworkAdapter {
    ///     name: "Ethernet".into(),
    ///     description: "Intel(R) Ethernet Connection #2".into(),
    ///     is_loopback: false,
    /// }]);
    /// assert_eq!(map.resolve("Intel[R] Ethernet Connection _2"), Some("Ethernet"));
    /// assert_eq!(map.resolve("vEthernet"), Some("vEthernet"));
    /// ```
    pub fn resolve<'a>(&'a self, instance: &'a str) -> Option<&'a str> {
        if self.loopback.contains(instance) {
            return None;
        }
        Some(
            self.friendly
                .get(instance)
                .map(String::as_str)
                .unwrap_or(instance),
        )
    }

    pub fn len(&self) -> usize {
        self.friendly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friendly.is_empty()
    }
}

/// Normalizes an adapter description the way performance counter
/// instance names are spelled.
pub fn counter_instance_name(description: &str) -> String {
    description
        .chars()
        .map(|c| match c {
            '(' => '[',
            ')' => ']',
            '#' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(name: &str, description: &str, is_loopback: bool) -> NetworkAdapter {
        NetworkAdapter {
            name: name.to_string(),
            description: description.to_string(),
            is_loopback,
        }
    }

    #[test]
    fn instance_name_replaces_reserved_characters() {
        assert_eq!(
            counter_instance_name("Realtek PCIe GbE (Family) #3 / LAN\\1"),
            "Realtek PCIe GbE [Family] _3 _ LAN_1"
        );
        assert_eq!(counter_instance_name("eth0"), "eth0");
    }

    #[test]
    fn known_instances_resolve_to_friendly_names() {
        let map = InterfaceNameMap::build(&[
            adapter("Ethernet", "Intel(R) I211 Gigabit", false),
            adapter("Wi-Fi", "Killer(R) Wireless #2", false),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("Intel[R] I211 Gigabit"), Some("Ethernet"));
        assert_eq!(map.resolve("Killer[R] Wireless _2"), Some("Wi-Fi"));
    }

    #[test]
    fn unknown_instance_falls_back_to_raw_name() {
        let map = InterfaceNameMap::build(&[]);
        assert!(map.is_empty());
        assert_eq!(map.resolve("docker0"), Some("docker0"));
    }

    #[test]
    fn loopback_instances_are_excluded() {
        let map = InterfaceNameMap::build(&[adapter("lo", "lo", true)]);
        assert!(map.is_empty());
        assert_eq!(map.resolve("lo"), None);
    }
}
