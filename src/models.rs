// Domain models

use serde::{Deserialize, Serialize};

/// The four counter families a host is sampled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::Disk => "disk",
            MetricKind::Network => "network",
        };
        f.write_str(s)
    }
}

/// Disk throughput in bytes per second, aggregated over all devices that
/// had a baseline this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DiskRate {
    pub read: f64,
    pub write: f64,
}

/// Network throughput in bytes per second, summed over non-loopback
/// interfaces that had a baseline this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkRate {
    pub received: f64,
    pub sent: f64,
}

/// One sampling pass over a host. A `None` field means that kind produced no
/// value this cycle: the counter source was unreadable, or a rate kind had no
/// baseline yet, or no wall-clock time elapsed since the previous reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleOutcome {
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
    pub disk: Option<DiskRate>,
    pub network: Option<NetworkRate>,
}

impl SampleOutcome {
    /// True when no kind produced a value (nothing to persist this cycle).
    pub fn is_empty(&self) -> bool {
        self.cpu_percent.is_none()
            && self.memory_percent.is_none()
            && self.disk.is_none()
            && self.network.is_none()
    }
}

/// Per-host metric averages over a query window. Field names are the wire
/// format of the query API; a field with no qualifying samples stays 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HostAverages {
    pub memory: f64,
    pub cpu: f64,
    pub disk_read: f64,
    pub disk_write: f64,
    pub network_read: f64,
    pub network_write: f64,
}
