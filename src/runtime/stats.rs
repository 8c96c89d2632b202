// ABOUTME: Typed subset of the engine's container stats sample.
// ABOUTME: Derives CPU percentage and memory usage the way `docker stats` does.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One stats sample. Unknown fields are ignored, missing ones default to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStats {
    pub id: String,
    pub name: String,
    pub read: String,
    pub cpu_stats: CpuStats,
    pub precpu_stats: CpuStats,
    pub memory_stats: MemoryStats,
    pub pids_stats: PidsStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<HashMap<String, NetworkStats>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuStats {
    pub cpu_usage: CpuUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_cpu_usage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_cpus: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuUsage {
    pub total_usage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percpu_usage: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub stats: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidsStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkStats {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl ContainerStats {
    /// CPU usage since the previous sample, as a percentage of one CPU.
    ///
    /// Zero for the first sample of a stream, which has no previous reading.
    pub fn cpu_percent(&self) -> f64 {
        let cpu_delta = self
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(self.precpu_stats.cpu_usage.total_usage);
        let system_delta = self
            .cpu_stats
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(self.precpu_stats.system_cpu_usage.unwrap_or(0));
        if cpu_delta == 0 || system_delta == 0 {
            return 0.0;
        }

        let cpus = self.cpu_stats.online_cpus.map(u64::from).unwrap_or_else(|| {
            self.cpu_stats
                .cpu_usage
                .percpu_usage
                .as_ref()
                .map(|p| p.len() as u64)
                .unwrap_or(1)
        });
        (cpu_delta as f64 / system_delta as f64) * cpus as f64 * 100.0
    }

    /// Memory in use, excluding inactive page cache.
    pub fn memory_usage(&self) -> u64 {
        let usage = self.memory_stats.usage.unwrap_or(0);
        // cgroup v1 reports total_inactive_file, v2 inactive_file.
        let inactive = self
            .memory_stats
            .stats
            .get("total_inactive_file")
            .or_else(|| self.memory_stats.stats.get("inactive_file"))
            .copied()
            .unwrap_or(0);
        if inactive < usage { usage - inactive } else { usage }
    }

    /// Memory usage as a percentage of the limit.
    pub fn memory_percent(&self) -> f64 {
        match self.memory_stats.limit {
            Some(limit) if limit > 0 => self.memory_usage() as f64 / limit as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// Container name without the leading slash the engine adds.
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }
}
