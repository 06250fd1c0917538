// Shared test helpers

use std::collections::HashMap;

use fleetmon::collector::{CounterReader, CpuTicks, IoCounters, MemoryCounters};
use fleetmon::error::CollectionError;

/// Deterministic counter source: every read advances each cumulative counter
/// by a fixed step, so consecutive samples always have a computable delta.
/// CPU advances 100 idle / 400 total ticks per read (75% busy).
pub struct FakeReader {
    cpu_reads: u64,
    disk_reads: u64,
    net_reads: u64,
}

impl FakeReader {
    pub fn new() -> Self {
        Self {
            cpu_reads: 0,
            disk_reads: 0,
            net_reads: 0,
        }
    }
}

impl CounterReader for FakeReader {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn cpu_ticks(&mut self) -> Result<CpuTicks, CollectionError> {
        self.cpu_reads += 1;
        Ok(CpuTicks {
            idle: 100 * self.cpu_reads,
            total: 400 * self.cpu_reads,
        })
    }

    fn memory_counters(&mut self) -> Result<MemoryCounters, CollectionError> {
        Ok(MemoryCounters {
            total_bytes: 1000,
            available_bytes: 250,
        })
    }

    fn disk_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        self.disk_reads += 1;
        Ok(HashMap::from([(
            "sda".to_string(),
            IoCounters {
                read_bytes: 1_000_000 * self.disk_reads,
                write_bytes: 500_000 * self.disk_reads,
            },
        )]))
    }

    fn network_counters(&mut self) -> Result<HashMap<String, IoCounters>, CollectionError> {
        self.net_reads += 1;
        Ok(HashMap::from([(
            "eth0".to_string(),
            IoCounters {
                read_bytes: 2_000_000 * self.net_reads,
                write_bytes: 250_000 * self.net_reads,
            },
        )]))
    }
}
