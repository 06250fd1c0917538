// Library reader: counter families via sysinfo.

use std::collections::HashMap;

use sysinfo::{Disks, Networks, System};

use super::{CounterReader, CpuTicks, IoCounters, MemoryCounters, raw};
use crate::error::CollectionError;
use crate::models::MetricKind;

pub struct LibraryReader {
    sys: System,
    disks: Disks,
    networks: Networks,
}

impl LibraryReader {
    /// Capability probe: the library qualifies when it initializes and can
    /// see the host's memory. Returns `None` otherwise so the caller falls
    /// back to raw pseudo-file parsing.
    pub fn probe() -> Option<Self> {
        let mut sys = System::new();
        sys.refresh_memory();
        if sys.total_memory() == 0 {
            return None;
        }
        Some(Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        })
    }
}

impl CounterReader for LibraryReader {
    fn name(&self) -> &'static str {
        "library"
    }

    /// sysinfo exposes only derived CPU usage, never the cumulative tick
    /// counters the delta math needs, so this family reads the pseudo-file
    /// on both paths.
    fn cpu_ticks(&mut self) -> Result<CpuTicks, CollectionError> {
        raw::read_cpu_ticks()
    }

    fn memory_counters(&mut self) -> Result<MemoryCounters, CollectionError> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(CollectionError::new(
                MetricKind::Memory,
                "library reports zero total memory",
            ));
        }
        Ok(MemoryCounters {
            total_bytes: total,
            available_bytes: self.sys.available_memory(),
        })
    }

    fn disk_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        self.disks.refresh(true);
        let mut counters = HashMap::new();
        for disk in self.disks.list() {
            let usage = disk.usage();
            counters.insert(
                disk.name().to_string_lossy().into_owned(),
                IoCounters {
                    read_bytes: usage.total_read_bytes,
                    write_bytes: usage.total_written_bytes,
                },
            );
        }
        Ok(counters)
    }

    fn network_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        self.networks.refresh(true);
        let mut counters = HashMap::new();
        for (name, data) in self.networks.list() {
            if name == "lo" {
                continue;
            }
            counters.insert(
                name.clone(),
                IoCounters {
                    read_bytes: data.total_received(),
                    write_bytes: data.total_transmitted(),
                },
            );
        }
        Ok(counters)
    }
}
