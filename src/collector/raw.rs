// Fallback reader: direct parsing of kernel pseudo-files. Produces the same
// cumulative counters as the library path.

use std::collections::HashMap;
use std::fs;

use super::{CounterReader, CpuTicks, IoCounters, MemoryCounters};
use crate::error::CollectionError;
use crate::models::MetricKind;

const PROC_STAT: &str = "/proc/stat";
const PROC_MEMINFO: &str = "/proc/meminfo";
const PROC_DISKSTATS: &str = "/proc/diskstats";
const PROC_NET_DEV: &str = "/proc/net/dev";

/// /proc/diskstats reports sectors in 512-byte units regardless of the
/// device's native sector size.
const SECTOR_BYTES: u64 = 512;

pub struct RawInterfaceReader;

impl RawInterfaceReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RawInterfaceReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterReader for RawInterfaceReader {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn cpu_ticks(&mut self) -> Result<CpuTicks, CollectionError> {
        read_cpu_ticks()
    }

    fn memory_counters(&mut self) -> Result<MemoryCounters, CollectionError> {
        parse_meminfo(&read_counter_file(PROC_MEMINFO, MetricKind::Memory)?)
    }

    fn disk_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        Ok(parse_diskstats(&read_counter_file(
            PROC_DISKSTATS,
            MetricKind::Disk,
        )?))
    }

    fn network_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        Ok(parse_net_dev(&read_counter_file(
            PROC_NET_DEV,
            MetricKind::Network,
        )?))
    }
}

/// Shared with the library reader, which has no cumulative CPU tick source.
pub(super) fn read_cpu_ticks() -> Result<CpuTicks, CollectionError> {
    parse_proc_stat(&read_counter_file(PROC_STAT, MetricKind::Cpu)?)
}

fn read_counter_file(path: &str, kind: MetricKind) -> Result<String, CollectionError> {
    fs::read_to_string(path).map_err(|e| CollectionError::new(kind, format!("{path}: {e}")))
}

/// Aggregate CPU ticks from the `cpu ` line of /proc/stat. `idle` is the
/// fourth column; `total` sums the eight accounted states (guest time is
/// already included in user time and would double count).
pub fn parse_proc_stat(content: &str) -> Result<CpuTicks, CollectionError> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| CollectionError::new(MetricKind::Cpu, "no aggregate cpu line in /proc/stat"))?;

    let ticks: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();
    if ticks.len() < 4 {
        return Err(CollectionError::new(
            MetricKind::Cpu,
            "aggregate cpu line has fewer than 4 tick columns",
        ));
    }

    Ok(CpuTicks {
        idle: ticks[3],
        total: ticks.iter().take(8).sum(),
    })
}

/// Memory totals from /proc/meminfo, in bytes. When the kernel predates
/// `MemAvailable`, approximate it as free + buffers + cached.
pub fn parse_meminfo(content: &str) -> Result<MemoryCounters, CollectionError> {
    let mut total = 0u64;
    let mut available = None;
    let mut free = 0u64;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let kib: u64 = rest
            .split_whitespace()
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let bytes = kib * 1024;
        match key {
            "MemTotal" => total = bytes,
            "MemAvailable" => available = Some(bytes),
            "MemFree" => free = bytes,
            "Buffers" => buffers = bytes,
            "Cached" => cached = bytes,
            _ => {}
        }
    }

    if total == 0 {
        return Err(CollectionError::new(
            MetricKind::Memory,
            "MemTotal missing or zero in /proc/meminfo",
        ));
    }
    Ok(MemoryCounters {
        total_bytes: total,
        available_bytes: available.unwrap_or(free + buffers + cached),
    })
}

/// Per-device cumulative read/write bytes from /proc/diskstats. Partitions,
/// loop devices, ram disks, and device-mapper nodes are skipped so a host
/// total does not double count.
pub fn parse_diskstats(content: &str) -> HashMap<String, IoCounters> {
    let mut counters = HashMap::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            continue;
        }
        let device = fields[2];
        if device.starts_with("loop") || device.starts_with("ram") || device.starts_with("dm-") {
            continue;
        }
        if is_partition(device) {
            continue;
        }
        let sectors_read: u64 = fields[5].parse().unwrap_or(0);
        let sectors_written: u64 = fields[9].parse().unwrap_or(0);
        counters.insert(
            device.to_string(),
            IoCounters {
                read_bytes: sectors_read * SECTOR_BYTES,
                write_bytes: sectors_written * SECTOR_BYTES,
            },
        );
    }
    counters
}

/// Partitions end in a digit; nvme namespaces (nvme0n1) are whole disks and
/// their partitions carry a 'p' separator (nvme0n1p1).
fn is_partition(device: &str) -> bool {
    let ends_in_digit = device.chars().last().is_some_and(|c| c.is_ascii_digit());
    if device.starts_with("nvme") {
        device.contains('p') && ends_in_digit
    } else {
        ends_in_digit
    }
}

/// Per-interface cumulative rx/tx bytes from /proc/net/dev, loopback
/// excluded. The interface name and first counter can be glued together
/// ("eth0:123456"), so split on the colon rather than on whitespace.
pub fn parse_net_dev(content: &str) -> HashMap<String, IoCounters> {
    let mut counters = HashMap::new();
    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let interface = name.trim();
        if interface == "lo" || interface.is_empty() {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 16 {
            continue;
        }
        counters.insert(
            interface.to_string(),
            IoCounters {
                read_bytes: fields[0].parse().unwrap_or(0),
                write_bytes: fields[8].parse().unwrap_or(0),
            },
        );
    }
    counters
}
