use serde::Serialize;
use trace_events::{CpuId, DeviceId, Tid};
use window::Window;

/// Bounds of the trace consumed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceInfo {
    pub start_ts: u64,
    pub end_ts: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuStats {
    pub cpu: CpuId,
    pub busy_ns: u64,
    /// Share of the window the CPU spent running tasks, 0-100
    pub busy_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyscallStats {
    pub name: String,
    pub count: u64,
    pub completed: u64,
    pub total_duration_ns: u64,
    pub avg_duration_ns: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub tid: Tid,
    pub comm: Option<String>,
    pub busy_ns: u64,
    /// Share of the window the task spent on a CPU, 0-100 per CPU
    pub busy_pct: f64,
    pub migration_count: u64,
    /// Latest switch-in, or the window start if the task was already running
    pub last_scheduled_ts: Option<u64>,
    /// Per-task syscall counts, busiest first
    pub syscalls: Vec<SyscallStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskStats {
    pub device: DeviceId,
    pub queued_count: u64,
    pub completed_count: u64,
    pub total_sectors: u64,
    pub total_request_time_ns: u64,
    pub avg_request_time_ns: Option<u64>,
}

/// Statistics for one closed window.
///
/// A report owns its data: the engine keeps mutating its tables after
/// handing one out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowReport {
    pub window: Window,
    pub trace: TraceInfo,
    /// Sorted by CPU id
    pub cpus: Vec<CpuStats>,
    /// Tasks active in the window, busiest first
    pub tasks: Vec<TaskStats>,
    /// Syscalls across all tasks, most frequent first
    pub syscalls: Vec<SyscallStats>,
    /// Sorted by device id
    pub disks: Vec<DiskStats>,
}

impl WindowReport {
    pub fn cpu(&self, cpu: CpuId) -> Option<&CpuStats> {
        self.cpus.iter().find(|stats| stats.cpu == cpu)
    }

    pub fn task(&self, tid: Tid) -> Option<&TaskStats> {
        self.tasks.iter().find(|stats| stats.tid == tid)
    }

    pub fn syscall(&self, name: &str) -> Option<&SyscallStats> {
        self.syscalls.iter().find(|stats| stats.name == name)
    }

    pub fn disk(&self, device: DeviceId) -> Option<&DiskStats> {
        self.disks.iter().find(|stats| stats.device == device)
    }

    /// Average busy percentage over the CPUs seen so far
    pub fn overall_busy_pct(&self) -> f64 {
        if self.cpus.is_empty() {
            return 0.0;
        }
        self.cpus.iter().map(|stats| stats.busy_pct).sum::<f64>() / self.cpus.len() as f64
    }
}
