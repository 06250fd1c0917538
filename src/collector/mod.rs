// Counter acquisition and delta math. One reader is selected at startup;
// the Sampler turns two successive counter snapshots into rates/percentages.

mod library;
mod raw;

pub use library::LibraryReader;
pub use raw::{RawInterfaceReader, parse_diskstats, parse_meminfo, parse_net_dev, parse_proc_stat};

use std::collections::HashMap;
use std::time::Instant;

use crate::error::CollectionError;
use crate::models::{DiskRate, NetworkRate, SampleOutcome};

/// Cumulative CPU time since boot, in jiffies. `total` spans every CPU state
/// so `idle / total` is a fraction of all elapsed tick time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub idle: u64,
    pub total: u64,
}

/// Instantaneous memory accounting, in bytes. `available` (not merely free)
/// so reclaimable cache counts as headroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounters {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Cumulative I/O byte counters since boot for one device or interface.
/// Network readings map received to `read_bytes` and sent to `write_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// A source of raw counter readings. Both implementations return cumulative
/// counters with identical semantics, so all delta computation lives in the
/// Sampler and downstream consumers never know which variant ran.
pub trait CounterReader: Send {
    fn name(&self) -> &'static str;

    fn cpu_ticks(&mut self) -> Result<CpuTicks, CollectionError>;
    fn memory_counters(&mut self) -> Result<MemoryCounters, CollectionError>;
    /// Per-device counters keyed by device name, whole disks only.
    fn disk_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError>;
    /// Per-interface counters keyed by interface name, loopback excluded.
    fn network_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError>;
}

/// The previous cumulative counter values plus the instant they were taken.
/// Ephemeral: held per host by the caller only long enough to compute the
/// next delta, never persisted.
#[derive(Debug, Clone)]
pub struct RawCounterSnapshot {
    pub taken_at: Instant,
    pub cpu: Option<CpuTicks>,
    pub disks: Option<HashMap<String, IoCounters>>,
    pub interfaces: Option<HashMap<String, IoCounters>>,
}

/// Select a counter reader once at startup: the metrics library when it
/// initializes and can see the host, otherwise direct kernel pseudo-file
/// parsing.
pub fn probe_reader() -> Box<dyn CounterReader> {
    match LibraryReader::probe() {
        Some(reader) => Box::new(reader),
        None => Box::new(RawInterfaceReader::new()),
    }
}

pub struct Sampler {
    reader: Box<dyn CounterReader>,
}

impl Sampler {
    pub fn new(reader: Box<dyn CounterReader>) -> Self {
        Self { reader }
    }

    pub fn reader_name(&self) -> &'static str {
        self.reader.name()
    }

    /// One sampling pass. `prev` is the baseline snapshot for this host from
    /// the previous pass; rate kinds are omitted when it is absent (first
    /// cycle) or when no wall-clock time has elapsed since it was taken.
    /// Returns the metrics alongside the snapshot to baseline the next pass.
    ///
    /// A counter family the reader cannot serve is logged and omitted; the
    /// remaining families are unaffected.
    pub fn sample(&mut self, prev: Option<&RawCounterSnapshot>) -> (SampleOutcome, RawCounterSnapshot) {
        let memory_percent = match self.reader.memory_counters() {
            Ok(mem) => memory_percent_of(mem),
            Err(e) => {
                tracing::warn!(error = %e, reader = self.reader.name(), "memory collection failed");
                None
            }
        };

        let current = RawCounterSnapshot {
            taken_at: Instant::now(),
            cpu: self.read_family("cpu", |r| r.cpu_ticks()),
            disks: self.read_family("disk", |r| r.disk_counters()),
            interfaces: self.read_family("network", |r| r.network_counters()),
        };

        let mut outcome = rates_between(prev, &current);
        outcome.memory_percent = memory_percent;
        (outcome, current)
    }

    fn read_family<T>(
        &mut self,
        what: &'static str,
        read: impl FnOnce(&mut dyn CounterReader) -> Result<T, CollectionError>,
    ) -> Option<T> {
        match read(self.reader.as_mut()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, reader = self.reader.name(), "{what} collection failed");
                None
            }
        }
    }
}

/// Memory utilization as `(total - available) / total * 100`.
pub fn memory_percent_of(mem: MemoryCounters) -> Option<f64> {
    if mem.total_bytes == 0 {
        return None;
    }
    let used = mem.total_bytes.saturating_sub(mem.available_bytes);
    Some(used as f64 / mem.total_bytes as f64 * 100.0)
}

/// Rate kinds from the delta between two snapshots. With no baseline, or no
/// elapsed wall-clock time, every rate kind stays `None` (no new data).
pub fn rates_between(prev: Option<&RawCounterSnapshot>, current: &RawCounterSnapshot) -> SampleOutcome {
    let Some(prev) = prev else {
        return SampleOutcome::default();
    };
    let elapsed_secs = current
        .taken_at
        .saturating_duration_since(prev.taken_at)
        .as_secs_f64();
    if elapsed_secs <= 0.0 {
        return SampleOutcome::default();
    }

    let cpu_percent = match (prev.cpu, current.cpu) {
        (Some(p), Some(c)) => Some(cpu_percent_between(p, c)),
        _ => None,
    };
    let disk = match (&prev.disks, &current.disks) {
        (Some(p), Some(c)) => {
            let (read, write) = io_rate_between(p, c, elapsed_secs);
            Some(DiskRate { read, write })
        }
        _ => None,
    };
    let network = match (&prev.interfaces, &current.interfaces) {
        (Some(p), Some(c)) => {
            let (received, sent) = io_rate_between(p, c, elapsed_secs);
            Some(NetworkRate { received, sent })
        }
        _ => None,
    };

    SampleOutcome {
        cpu_percent,
        memory_percent: None,
        disk,
        network,
    }
}

/// CPU utilization over the interval between two tick readings:
/// `100 * (1 - idle_delta / total_delta)`, clamped to [0, 100] so counter
/// wraparound or clock skew cannot produce negative or over-100 artifacts.
/// Unchanged counters yield 0, never a division fault.
pub fn cpu_percent_between(prev: CpuTicks, current: CpuTicks) -> f64 {
    let total_delta = current.total.saturating_sub(prev.total);
    if total_delta == 0 {
        return 0.0;
    }
    let idle_delta = current.idle.saturating_sub(prev.idle);
    let percent = 100.0 * (1.0 - idle_delta as f64 / total_delta as f64);
    percent.clamp(0.0, 100.0)
}

/// Host-level (read, write) bytes/sec between two per-device counter maps.
/// Only devices present in both snapshots contribute; a device added or
/// removed between samples is missing-baseline for this cycle and skipped.
/// The caller guarantees `elapsed_secs > 0`.
pub fn io_rate_between(
    prev: &HashMap<String, IoCounters>,
    current: &HashMap<String, IoCounters>,
    elapsed_secs: f64,
) -> (f64, f64) {
    let mut read_delta: u64 = 0;
    let mut write_delta: u64 = 0;
    for (device, cur) in current {
        if let Some(p) = prev.get(device) {
            read_delta += cur.read_bytes.saturating_sub(p.read_bytes);
            write_delta += cur.write_bytes.saturating_sub(p.write_bytes);
        }
    }
    (
        read_delta as f64 / elapsed_secs,
        write_delta as f64 / elapsed_secs,
    )
}
