//! Synchronous host metric collection.
//!
//! The CPU reading needs two refreshes separated by a short wait, so this
//! blocks for around [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`]. Callers on the
//! async runtime must run it through `spawn_blocking`.

use chrono::Utc;
use sysinfo::{Disks, System};
use tracing::trace;

use crate::MetricSample;

/// Collect one CPU/RAM/disk snapshot. Blocking.
pub fn collect() -> MetricSample {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_usage();
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let cpu_pct = sys.global_cpu_usage();
    let ram_pct = percentage(sys.used_memory(), sys.total_memory());

    let disks = Disks::new_with_refreshed_list();
    let disk_pct = root_disk_usage(&disks);

    let sample = MetricSample {
        cpu_pct,
        ram_pct,
        disk_pct,
        timestamp: Utc::now(),
    };
    trace!("collected sample: {sample:?}");
    sample
}

/// Usage of the root filesystem, falling back to the fullest disk when no "/"
/// mount is listed (containers, unusual layouts).
fn root_disk_usage(disks: &Disks) -> f32 {
    let root = disks
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"));

    if let Some(disk) = root {
        return disk_percentage(disk.total_space(), disk.available_space());
    }

    disks
        .iter()
        .map(|disk| disk_percentage(disk.total_space(), disk.available_space()))
        .fold(0.0, f32::max)
}

fn disk_percentage(total: u64, available: u64) -> f32 {
    percentage(total.saturating_sub(available), total)
}

fn percentage(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0) as f32
}
