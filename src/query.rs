// Time-window tokens and the aggregation engine behind the query API.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::error::MetricsError;
use crate::metrics_repo::MetricsRepo;
use crate::models::HostAverages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl WindowUnit {
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            's' => Some(WindowUnit::Second),
            'm' => Some(WindowUnit::Minute),
            'h' => Some(WindowUnit::Hour),
            'd' => Some(WindowUnit::Day),
            'w' => Some(WindowUnit::Week),
            _ => None,
        }
    }

    pub fn seconds(self) -> u64 {
        match self {
            WindowUnit::Second => 1,
            WindowUnit::Minute => 60,
            WindowUnit::Hour => 3_600,
            WindowUnit::Day => 86_400,
            WindowUnit::Week => 604_800,
        }
    }
}

/// A parsed relative time span, e.g. `5m` = the last five minutes. Magnitude
/// 0 is valid and resolves to a cutoff of "now" (empty qualifying set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub magnitude: u64,
    pub unit: WindowUnit,
}

impl TimeWindow {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.magnitude.saturating_mul(self.unit.seconds()))
    }

    /// `now - duration` in epoch milliseconds, saturating at the epoch for
    /// windows larger than all of history.
    pub fn cutoff_ms(&self, now_ms: i64) -> i64 {
        let window_ms = i64::try_from(self.duration().as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(window_ms)
    }
}

impl FromStr for TimeWindow {
    type Err = MetricsError;

    /// Accepts exactly one or more ASCII digits followed by one unit letter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MetricsError::InvalidWindowFormat(s.to_string());
        if s.len() < 2 || !s.is_ascii() {
            return Err(invalid());
        }
        let (digits, suffix) = s.split_at(s.len() - 1);
        let unit = suffix
            .chars()
            .next()
            .and_then(WindowUnit::from_suffix)
            .ok_or_else(invalid)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let magnitude = digits.parse().map_err(|_| invalid())?;
        Ok(TimeWindow { magnitude, unit })
    }
}

/// Read-only aggregation over the sample store. Pure: repeated queries
/// against an unchanged store return identical results.
pub struct QueryEngine {
    repo: Arc<MetricsRepo>,
}

impl QueryEngine {
    pub fn new(repo: Arc<MetricsRepo>) -> Self {
        Self { repo }
    }

    /// Per-host metric averages over `window` (`None` = all history),
    /// restricted to `hosts` when supplied. The response carries one entry
    /// per host (the filter list verbatim, or every known host), with 0 for
    /// any metric that has no qualifying samples.
    #[instrument(skip(self), fields(operation = "averages"))]
    pub async fn averages(
        &self,
        window: Option<TimeWindow>,
        hosts: Option<&[String]>,
    ) -> Result<BTreeMap<String, HostAverages>, MetricsError> {
        let cutoff_ms = window.map(|w| w.cutoff_ms(chrono::Utc::now().timestamp_millis()));

        let mut stats: BTreeMap<String, HostAverages> = match hosts {
            Some(list) => list
                .iter()
                .map(|h| (h.clone(), HostAverages::default()))
                .collect(),
            None => self
                .repo
                .known_hosts()
                .await?
                .into_iter()
                .map(|h| (h, HostAverages::default()))
                .collect(),
        };

        for (host, memory) in self.repo.memory_averages(cutoff_ms).await? {
            if let Some(entry) = stats.get_mut(&host) {
                entry.memory = memory;
            }
        }
        for (host, cpu) in self.repo.cpu_averages(cutoff_ms).await? {
            if let Some(entry) = stats.get_mut(&host) {
                entry.cpu = cpu;
            }
        }
        for (host, read, write) in self.repo.disk_averages(cutoff_ms).await? {
            if let Some(entry) = stats.get_mut(&host) {
                entry.disk_read = read;
                entry.disk_write = write;
            }
        }
        for (host, received, sent) in self.repo.network_averages(cutoff_ms).await? {
            if let Some(entry) = stats.get_mut(&host) {
                entry.network_read = received;
                entry.network_write = sent;
            }
        }

        Ok(stats)
    }
}
