//! Host-wide CPU, memory, disk and network sampler backed by `sysinfo`.
//!
//! CPU utilisation needs two readings separated by a short window, so
//! `collect` blocks for `cpu_window` on every call. Disk and network values
//! are cumulative counters since boot, summed across devices/interfaces.

use super::MetricsSource;
use crate::error::{MonitorError, Result};
use crate::types::{Metrics, bytes_to_mb};
use chrono::{Local, NaiveDateTime, SubsecRound};
use log::debug;
use std::collections::HashSet;
use std::time::Duration;
use sysinfo::{
    CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, MemoryRefreshKind, Networks, RefreshKind,
    System,
};

pub struct SystemSampler {
    system: System,
    disks: Disks,
    networks: Networks,
    cpu_window: Duration,
    last_timestamp: Option<NaiveDateTime>,
}

impl SystemSampler {
    pub fn new(cpu_window: Duration) -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            cpu_window: cpu_window.max(MINIMUM_CPU_UPDATE_INTERVAL),
            last_timestamp: None,
        }
    }

    /// Wall-clock second, never earlier than the previous sample's.
    fn next_timestamp(&mut self) -> NaiveDateTime {
        let now = Local::now().naive_local().trunc_subsecs(0);
        let ts = match self.last_timestamp {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn cpu_usage(&mut self) -> f64 {
        self.system.refresh_cpu_usage();
        std::thread::sleep(self.cpu_window);
        self.system.refresh_cpu_usage();
        clamp_percent(self.system.global_cpu_usage() as f64)
    }

    fn memory_usage(&mut self) -> Result<f64> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(MonitorError::sample_unavailable(
                "host reported zero total memory",
            ));
        }
        Ok(clamp_percent(
            self.system.used_memory() as f64 / total as f64 * 100.0,
        ))
    }

    /// (read, written) bytes since boot, each physical device counted once.
    fn disk_totals(&mut self) -> (u64, u64) {
        self.disks.refresh(true);

        let mut seen = HashSet::new();
        self.disks
            .list()
            .iter()
            .filter(|disk| seen.insert(disk.name().to_os_string()))
            .fold((0u64, 0u64), |(read, written), disk| {
                let usage = disk.usage();
                (
                    read.saturating_add(usage.total_read_bytes),
                    written.saturating_add(usage.total_written_bytes),
                )
            })
    }

    /// (transmitted, received) bytes since boot across all interfaces.
    fn network_totals(&mut self) -> (u64, u64) {
        self.networks.refresh(true);
        self.networks
            .list()
            .values()
            .fold((0u64, 0u64), |(sent, received), data| {
                (
                    sent.saturating_add(data.total_transmitted()),
                    received.saturating_add(data.total_received()),
                )
            })
    }
}

impl MetricsSource for SystemSampler {
    fn collect(&mut self) -> Result<Metrics> {
        let timestamp = self.next_timestamp();
        let cpu_usage = self.cpu_usage();
        let memory_usage = self.memory_usage()?;
        let (disk_read, disk_write) = self.disk_totals();
        let (net_sent, net_received) = self.network_totals();

        debug!(
            "[sampler] disks={} interfaces={}",
            self.disks.list().len(),
            self.networks.list().len()
        );

        Ok(Metrics {
            timestamp,
            cpu_usage,
            memory_usage,
            disk_read: bytes_to_mb(disk_read),
            disk_write: bytes_to_mb(disk_write),
            network_sent: bytes_to_mb(net_sent),
            network_received: bytes_to_mb(net_received),
        })
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
